// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Resolved attributes of one runit service.
//!
//! [`Service::from_config`] fills in the defaults that depend on other
//! attributes (template names fall back to the service name, `env_dir` is
//! exposed to templates when environment variables are set) and validates
//! what serde cannot.

use crate::action::Action;
use crate::config::{LogSocket, ServiceConfig};
use crate::errors::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Control characters understood by runsv for `control/<signal>` overrides.
pub const CONTROL_SIGNALS: &[&str] = &[
    "u", "d", "o", "p", "c", "h", "a", "i", "q", "1", "2", "t", "k", "x",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub size: Option<u64>,
    pub num: Option<u64>,
    pub min: Option<u64>,
    pub timeout: Option<u64>,
    pub processor: Option<String>,
    pub socket: Option<LogSocket>,
    pub prefix: Option<String>,
    pub append: Option<String>,
}

impl LogConfig {
    /// Contents of the svlogd `config` file, one directive per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let directives = [
            ('s', self.size.map(|v| v.to_string())),
            ('n', self.num.map(|v| v.to_string())),
            ('N', self.min.map(|v| v.to_string())),
            ('t', self.timeout.map(|v| v.to_string())),
            ('!', self.processor.clone()),
            ('u', self.socket.as_ref().map(|s| s.to_string())),
            ('p', self.prefix.clone()),
        ];
        for (directive, value) in directives {
            if let Some(value) = value {
                out.push(directive);
                out.push_str(&value);
                out.push('\n');
            }
        }
        if let Some(ref append) = self.append {
            out.push_str(append);
            if !append.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub actions: Vec<Action>,
    pub service_name: String,
    pub default_logger: bool,
    pub log_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub log_config: LogConfig,
    pub templates_dir: PathBuf,
    pub restart_on_update: bool,
    pub sv_bin: PathBuf,
    pub sv_dir: PathBuf,
    pub sv_verbose: bool,
    pub sv_timeout: Option<u64>,
    pub sv_templates: bool,
    pub service_dir: PathBuf,
    pub run_template_name: String,
    pub log_template_name: String,
    pub check_script_template_name: String,
    pub finish_script_template_name: String,
    pub log: bool,
    pub check: bool,
    pub finish: bool,
    pub control: Vec<String>,
    pub control_template_names: BTreeMap<String, String>,
    pub lsb_init_dir: PathBuf,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub readiness_timeout: Option<Duration>,
}

impl Service {
    pub fn from_config(name: &str, config: ServiceConfig) -> Result<Self> {
        let service_name = config.service_name.unwrap_or_else(|| name.to_string());
        validate_file_name("service_name", &service_name)?;

        let run_template_name = config
            .run_template_name
            .unwrap_or_else(|| service_name.clone());
        let log_template_name = config
            .log_template_name
            .unwrap_or_else(|| run_template_name.clone());
        let check_script_template_name = config
            .check_script_template_name
            .unwrap_or_else(|| run_template_name.clone());
        let finish_script_template_name = config
            .finish_script_template_name
            .unwrap_or_else(|| run_template_name.clone());

        for var in config.env.keys() {
            validate_file_name("env", var)?;
        }
        for signal in &config.control {
            if !CONTROL_SIGNALS.contains(&signal.as_str()) {
                return Err(Error::InvalidAttribute {
                    name: "control",
                    reason: format!("unknown control signal '{signal}'"),
                });
            }
        }
        if let Some(signal) = config
            .control_template_names
            .keys()
            .find(|s| !config.control.contains(s))
        {
            return Err(Error::InvalidAttribute {
                name: "control_template_names",
                reason: format!("signal '{signal}' is not listed in control"),
            });
        }

        let mut options: BTreeMap<String, String> = config
            .options
            .into_iter()
            .map(|(k, v)| (k, scalar_to_string(&v)))
            .collect();
        if !config.env.is_empty() {
            let env_dir = config.sv_dir.join(&service_name).join("env");
            options.insert("env_dir".to_string(), env_dir.display().to_string());
        }

        let log_dir = config
            .log_dir
            .unwrap_or_else(|| PathBuf::from("/var/log").join(&service_name));

        Ok(Self {
            name: name.to_string(),
            actions: config.action,
            service_name,
            default_logger: config.default_logger,
            log_dir,
            env: config.env,
            options,
            log_config: LogConfig {
                size: config.log_size,
                num: config.log_num,
                min: config.log_min,
                timeout: config.log_timeout,
                processor: config.log_processor,
                socket: config.log_socket,
                prefix: config.log_prefix,
                append: config.log_config_append,
            },
            templates_dir: config.templates_dir,
            restart_on_update: config.restart_on_update,
            sv_bin: config.sv_bin,
            sv_dir: config.sv_dir,
            sv_verbose: config.sv_verbose,
            sv_timeout: config.sv_timeout,
            sv_templates: config.sv_templates,
            service_dir: config.service_dir,
            run_template_name,
            log_template_name,
            check_script_template_name,
            finish_script_template_name,
            log: config.log,
            check: config.check,
            finish: config.finish,
            control: config.control,
            control_template_names: config.control_template_names,
            lsb_init_dir: config.lsb_init_dir,
            owner: config.owner,
            group: config.group,
            readiness_timeout: match config.readiness_timeout {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }

    /// `<sv_dir>/<service_name>`, where the configuration lives.
    pub fn sv_dir_name(&self) -> PathBuf {
        self.sv_dir.join(&self.service_name)
    }

    /// `<service_dir>/<service_name>`, the link runsvdir watches.
    pub fn service_dir_name(&self) -> PathBuf {
        self.service_dir.join(&self.service_name)
    }

    pub fn env_dir(&self) -> PathBuf {
        self.sv_dir_name().join("env")
    }

    pub fn lsb_init_path(&self) -> PathBuf {
        self.lsb_init_dir.join(&self.service_name)
    }

    pub fn template_path(&self, template_name: &str, suffix: &str) -> PathBuf {
        self.templates_dir
            .join(format!("sv-{template_name}-{suffix}.erb"))
    }

    pub fn control_template_name(&self, signal: &str) -> &str {
        self.control_template_names
            .get(signal)
            .map(String::as_str)
            .unwrap_or(&self.run_template_name)
    }

    /// Variables handed to every rendered template.
    pub fn template_variables(&self) -> BTreeMap<String, String> {
        let mut vars = self.options.clone();
        vars.insert("service_name".into(), self.service_name.clone());
        vars.insert("sv_bin".into(), self.sv_bin.display().to_string());
        vars.insert("sv_dir".into(), self.sv_dir_name().display().to_string());
        vars.insert(
            "service_dir".into(),
            self.service_dir_name().display().to_string(),
        );
        vars
    }

    pub(crate) fn log_prefix(&self) -> String {
        format!("[{}]", self.service_name)
    }
}

fn validate_file_name(attribute: &'static str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains('/') {
        return Err(Error::InvalidAttribute {
            name: attribute,
            reason: format!("'{value}' is not a valid file name"),
        });
    }
    Ok(())
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        ServiceConfig::new("/tpl")
    }

    #[test]
    fn test_defaults_follow_name() {
        let svc = Service::from_config("web", config()).unwrap();
        assert_eq!(svc.service_name, "web");
        assert_eq!(svc.run_template_name, "web");
        assert_eq!(svc.log_template_name, "web");
        assert_eq!(svc.check_script_template_name, "web");
        assert_eq!(svc.finish_script_template_name, "web");
        assert_eq!(svc.readiness_timeout, Some(Duration::from_secs(60)));
        assert!(!svc.options.contains_key("env_dir"));
    }

    #[test]
    fn test_template_names_follow_run_template() {
        let mut cfg = config();
        cfg.run_template_name = Some("rails".into());
        cfg.finish_script_template_name = Some("cleanup".into());
        let svc = Service::from_config("web", cfg).unwrap();
        assert_eq!(svc.log_template_name, "rails");
        assert_eq!(svc.finish_script_template_name, "cleanup");
        assert_eq!(
            svc.template_path(&svc.run_template_name, "run"),
            PathBuf::from("/tpl/sv-rails-run.erb")
        );
    }

    #[test]
    fn test_env_sets_env_dir_option() {
        let mut cfg = config();
        cfg.sv_dir = PathBuf::from("/opt/sv");
        cfg.env.insert("PORT".into(), "80".into());
        let svc = Service::from_config("web", cfg).unwrap();
        assert_eq!(svc.options["env_dir"], "/opt/sv/web/env");
        assert_eq!(svc.env_dir(), PathBuf::from("/opt/sv/web/env"));
    }

    #[test]
    fn test_paths() {
        let svc = Service::from_config("web", config()).unwrap();
        assert_eq!(svc.sv_dir_name(), PathBuf::from("/etc/sv/web"));
        assert_eq!(svc.service_dir_name(), PathBuf::from("/etc/service/web"));
        assert_eq!(svc.lsb_init_path(), PathBuf::from("/etc/init.d/web"));
        assert_eq!(svc.log_dir, PathBuf::from("/var/log/web"));
    }

    #[test]
    fn test_invalid_control_signal() {
        let mut cfg = config();
        cfg.control = vec!["z".into()];
        let err = Service::from_config("web", cfg).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { name: "control", .. }));
    }

    #[test]
    fn test_control_template_for_unlisted_signal() {
        let mut cfg = config();
        cfg.control = vec!["t".into()];
        cfg.control_template_names
            .insert("d".into(), "web-down".into());
        let err = Service::from_config("web", cfg).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAttribute {
                name: "control_template_names",
                ..
            }
        ));
    }

    #[test]
    fn test_control_template_name_fallback() {
        let mut cfg = config();
        cfg.control = vec!["t".into(), "d".into()];
        cfg.control_template_names
            .insert("t".into(), "graceful".into());
        let svc = Service::from_config("web", cfg).unwrap();
        assert_eq!(svc.control_template_name("t"), "graceful");
        assert_eq!(svc.control_template_name("d"), "web");
    }

    #[test]
    fn test_env_var_names_must_be_file_names() {
        let mut cfg = config();
        cfg.env.insert("../escape".into(), "x".into());
        assert!(Service::from_config("web", cfg).is_err());
    }

    #[test]
    fn test_service_name_must_be_file_name() {
        let mut cfg = config();
        cfg.service_name = Some("a/b".into());
        assert!(Service::from_config("web", cfg).is_err());
    }

    #[test]
    fn test_zero_readiness_timeout_is_unbounded() {
        let mut cfg = config();
        cfg.readiness_timeout = 0;
        let svc = Service::from_config("web", cfg).unwrap();
        assert!(svc.readiness_timeout.is_none());
    }

    #[test]
    fn test_options_become_template_variables() {
        let mut cfg = config();
        cfg.options
            .insert("workers".into(), serde_yaml::Value::from(4));
        cfg.options
            .insert("user".into(), serde_yaml::Value::from("www-data"));
        let svc = Service::from_config("web", cfg).unwrap();
        let vars = svc.template_variables();
        assert_eq!(vars["workers"], "4");
        assert_eq!(vars["user"], "www-data");
        assert_eq!(vars["service_name"], "web");
        assert_eq!(vars["sv_dir"], "/etc/sv/web");
        assert_eq!(vars["service_dir"], "/etc/service/web");
        assert_eq!(vars["sv_bin"], "/usr/bin/sv");
    }

    #[test]
    fn test_log_config_render() {
        let log = LogConfig {
            size: Some(1000),
            num: Some(5),
            min: None,
            timeout: Some(3600),
            processor: Some("gzip".into()),
            socket: Some(LogSocket::Udp {
                ip: "10.0.0.1".into(),
                port: 514,
            }),
            prefix: Some("web".into()),
            append: Some("-*.debug".into()),
        };
        assert_eq!(
            log.render(),
            "s1000\nn5\nt3600\n!gzip\nu10.0.0.1:514\npweb\n-*.debug\n"
        );
    }

    #[test]
    fn test_log_config_render_empty() {
        assert_eq!(LogConfig::default().render(), "");
    }
}
