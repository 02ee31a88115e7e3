// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::action::{Action, deserialize_actions};
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = "/etc/datadog-agent/runit.d";
const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 60;

fn default_true() -> bool {
    true
}

fn default_actions() -> Vec<Action> {
    vec![Action::Enable]
}

fn default_sv_bin() -> PathBuf {
    PathBuf::from("/usr/bin/sv")
}

fn default_sv_dir() -> PathBuf {
    PathBuf::from("/etc/sv")
}

fn default_service_dir() -> PathBuf {
    PathBuf::from("/etc/service")
}

fn default_lsb_init_dir() -> PathBuf {
    PathBuf::from("/etc/init.d")
}

fn default_readiness_timeout() -> u64 {
    DEFAULT_READINESS_TIMEOUT_SECS
}

/// Where svlogd should forward log lines: a plain `host:port` string or a
/// structured address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LogSocket {
    Address(String),
    Udp { ip: String, port: u16 },
}

impl std::fmt::Display for LogSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSocket::Address(addr) => f.write_str(addr),
            LogSocket::Udp { ip, port } => write!(f, "{ip}:{port}"),
        }
    }
}

/// One runit service resource as written in a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_actions", deserialize_with = "deserialize_actions")]
    pub action: Vec<Action>,
    pub service_name: Option<String>,
    #[serde(default)]
    pub default_logger: bool,
    /// Directory svlogd writes to when `default_logger` is set.
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>,
    pub log_size: Option<u64>,
    pub log_num: Option<u64>,
    pub log_min: Option<u64>,
    pub log_timeout: Option<u64>,
    pub log_processor: Option<String>,
    pub log_socket: Option<LogSocket>,
    pub log_prefix: Option<String>,
    pub log_config_append: Option<String>,
    pub templates_dir: PathBuf,
    #[serde(default = "default_true")]
    pub restart_on_update: bool,
    #[serde(default = "default_sv_bin")]
    pub sv_bin: PathBuf,
    #[serde(default = "default_sv_dir")]
    pub sv_dir: PathBuf,
    #[serde(default)]
    pub sv_verbose: bool,
    pub sv_timeout: Option<u64>,
    #[serde(default = "default_true")]
    pub sv_templates: bool,
    #[serde(default = "default_service_dir")]
    pub service_dir: PathBuf,
    pub run_template_name: Option<String>,
    pub log_template_name: Option<String>,
    pub check_script_template_name: Option<String>,
    pub finish_script_template_name: Option<String>,
    #[serde(default = "default_true")]
    pub log: bool,
    #[serde(default)]
    pub check: bool,
    #[serde(default)]
    pub finish: bool,
    #[serde(default)]
    pub control: Vec<String>,
    #[serde(default)]
    pub control_template_names: BTreeMap<String, String>,
    #[serde(default = "default_lsb_init_dir")]
    pub lsb_init_dir: PathBuf,
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Seconds to wait for `supervise/ok`; 0 waits forever.
    #[serde(default = "default_readiness_timeout")]
    pub readiness_timeout: u64,
}

impl ServiceConfig {
    /// A config with every attribute at its default, rooted at `templates_dir`.
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            action: default_actions(),
            service_name: None,
            default_logger: false,
            log_dir: None,
            env: BTreeMap::new(),
            options: BTreeMap::new(),
            log_size: None,
            log_num: None,
            log_min: None,
            log_timeout: None,
            log_processor: None,
            log_socket: None,
            log_prefix: None,
            log_config_append: None,
            templates_dir: templates_dir.into(),
            restart_on_update: true,
            sv_bin: default_sv_bin(),
            sv_dir: default_sv_dir(),
            sv_verbose: false,
            sv_timeout: None,
            sv_templates: true,
            service_dir: default_service_dir(),
            run_template_name: None,
            log_template_name: None,
            check_script_template_name: None,
            finish_script_template_name: None,
            log: true,
            check: false,
            finish: false,
            control: Vec::new(),
            control_template_names: BTreeMap::new(),
            lsb_init_dir: default_lsb_init_dir(),
            owner: None,
            group: None,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT_SECS,
        }
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("DD_RUNIT_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// A resource file that was found but not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Resources read from a config directory, in file name order.
#[derive(Debug, Default)]
pub struct LoadedConfigs {
    pub services: Vec<(String, ServiceConfig)>,
    pub skipped: Vec<SkippedFile>,
}

fn is_resource_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Load every `*.yaml`/`*.yml` resource in `dir`. The file stem names the
/// resource. Files that cannot be parsed, whose stem is not UTF-8, or whose
/// name repeats an earlier file (`web.yaml` and `web.yml`) are skipped and
/// reported in [`LoadedConfigs::skipped`].
pub fn load_configs(dir: &Path) -> Result<LoadedConfigs> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read config directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) if is_resource_file(&entry.path()) => paths.push(entry.path()),
            Ok(entry) => debug!("ignoring {}", entry.path().display()),
            Err(e) => warn!("skipping unreadable entry in {}: {e}", dir.display()),
        }
    }
    paths.sort();

    let mut loaded = LoadedConfigs::default();
    let mut seen = BTreeSet::new();
    for path in paths {
        let parsed = match path.file_stem().and_then(|s| s.to_str()) {
            None => Err("file name is not valid UTF-8".to_string()),
            Some(name) if seen.contains(name) => {
                Err(format!("resource '{name}' is already defined by another file"))
            }
            Some(name) => parse_config(&path)
                .map(|config| (name.to_string(), config))
                .map_err(|e| format!("{e:#}")),
        };
        match parsed {
            Ok((name, config)) => {
                seen.insert(name.clone());
                loaded.services.push((name, config));
            }
            Err(reason) => {
                warn!("skipping {}: {reason}", path.display());
                loaded.skipped.push(SkippedFile { path, reason });
            }
        }
    }

    Ok(loaded)
}

pub fn parse_config(path: &Path) -> Result<ServiceConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = r#"
action: [enable, hup]
service_name: web
default_logger: true
env:
  PORT: "8080"
  RAILS_ENV: production
options:
  user: www-data
  workers: 4
log_size: 1000000
log_num: 10
log_socket:
  ip: 10.0.0.1
  port: 514
templates_dir: /srv/templates
restart_on_update: false
sv_timeout: 5
sv_verbose: true
check: true
control: [t, d]
control_template_names:
  t: web-graceful
owner: www-data
group: www-data
readiness_timeout: 0
"#;
        fs::write(dir.path().join("web-app.yaml"), yaml).unwrap();

        let loaded = load_configs(dir.path()).unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert!(loaded.skipped.is_empty());

        let (name, cfg) = &loaded.services[0];
        assert_eq!(name, "web-app");
        assert_eq!(cfg.action, vec![Action::Enable, Action::Hup]);
        assert_eq!(cfg.service_name.as_deref(), Some("web"));
        assert!(cfg.default_logger);
        assert_eq!(cfg.env["PORT"], "8080");
        assert_eq!(cfg.options["workers"], serde_yaml::Value::from(4));
        assert_eq!(cfg.log_size, Some(1_000_000));
        assert_eq!(
            cfg.log_socket,
            Some(LogSocket::Udp {
                ip: "10.0.0.1".into(),
                port: 514
            })
        );
        assert_eq!(cfg.templates_dir, PathBuf::from("/srv/templates"));
        assert!(!cfg.restart_on_update);
        assert_eq!(cfg.sv_timeout, Some(5));
        assert!(cfg.sv_verbose);
        assert!(cfg.check);
        assert_eq!(cfg.control, vec!["t", "d"]);
        assert_eq!(cfg.control_template_names["t"], "web-graceful");
        assert_eq!(cfg.owner.as_deref(), Some("www-data"));
        assert_eq!(cfg.readiness_timeout, 0);
    }

    #[test]
    fn test_parse_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("minimal.yaml"), "templates_dir: /tpl\n").unwrap();

        let configs = load_configs(dir.path()).unwrap().services;
        assert_eq!(configs.len(), 1);

        let (name, cfg) = &configs[0];
        assert_eq!(name, "minimal");
        assert_eq!(cfg.action, vec![Action::Enable]);
        assert!(cfg.service_name.is_none());
        assert!(cfg.restart_on_update);
        assert!(cfg.log);
        assert!(cfg.sv_templates);
        assert!(!cfg.default_logger);
        assert_eq!(cfg.sv_bin, PathBuf::from("/usr/bin/sv"));
        assert_eq!(cfg.sv_dir, PathBuf::from("/etc/sv"));
        assert_eq!(cfg.service_dir, PathBuf::from("/etc/service"));
        assert_eq!(cfg.lsb_init_dir, PathBuf::from("/etc/init.d"));
        assert_eq!(cfg.readiness_timeout, 60);
        assert!(cfg.control.is_empty());
    }

    #[test]
    fn test_single_action_string() {
        let cfg: ServiceConfig =
            serde_yaml::from_str("action: term\ntemplates_dir: /tpl\n").unwrap();
        assert_eq!(cfg.action, vec![Action::Term]);
    }

    #[test]
    fn test_log_socket_plain_string() {
        let cfg: ServiceConfig =
            serde_yaml::from_str("templates_dir: /tpl\nlog_socket: 'logs.local:514'\n").unwrap();
        assert_eq!(cfg.log_socket.unwrap().to_string(), "logs.local:514");
    }

    #[test]
    fn test_templates_dir_required() {
        let result: Result<ServiceConfig, _> = serde_yaml::from_str("service_name: web\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<ServiceConfig, _> =
            serde_yaml::from_str("action: reload\ntemplates_dir: /tpl\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let result: Result<ServiceConfig, _> =
            serde_yaml::from_str("templates_dir: /tpl\nsv_binary: /bin/sv\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.yaml"), "templates_dir: /tpl\n").unwrap();
        fs::write(dir.path().join("bad.yaml"), "not: valid: yaml: [").unwrap();
        fs::write(dir.path().join("ugly.yaml"), "action: start\ntemplates_dir: /t\n").unwrap();

        let loaded = load_configs(dir.path()).unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.services[0].0, "good");

        let skipped: Vec<PathBuf> = loaded.skipped.iter().map(|s| s.path.clone()).collect();
        assert_eq!(
            skipped,
            vec![dir.path().join("bad.yaml"), dir.path().join("ugly.yaml")]
        );
        assert!(
            loaded.skipped[1].reason.starts_with("parsing "),
            "{}",
            loaded.skipped[1].reason
        );
    }

    #[test]
    fn test_duplicate_resource_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("web.yaml"), "templates_dir: /a\n").unwrap();
        fs::write(dir.path().join("web.yml"), "templates_dir: /b\n").unwrap();

        let loaded = load_configs(dir.path()).unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.services[0].1.templates_dir, PathBuf::from("/a"));
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].path, dir.path().join("web.yml"));
        assert!(loaded.skipped[0].reason.contains("already defined"));
    }

    #[test]
    fn test_sorted_alphabetically() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("charlie.yaml"), "templates_dir: /c\n").unwrap();
        fs::write(dir.path().join("alpha.yml"), "templates_dir: /a\n").unwrap();
        fs::write(dir.path().join("bravo.yaml"), "templates_dir: /b\n").unwrap();
        fs::write(dir.path().join("readme.txt"), "not a config").unwrap();

        let loaded = load_configs(dir.path()).unwrap();
        assert!(loaded.skipped.is_empty(), "non-YAML files are ignored, not skipped");
        let names: Vec<&str> = loaded
            .services
            .iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_load_configs_nonexistent_directory() {
        let result = load_configs(Path::new("/nonexistent/runit.d"));
        assert!(result.is_err());
    }
}
