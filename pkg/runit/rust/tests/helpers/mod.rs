// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread::JoinHandle;
use std::time::Duration;

/// Stand-in for `sv`: appends its arguments to `sv.calls` and reports the
/// service as running unless `FAKE_SV_STATE=down`.
const FAKE_SV: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/../sv.calls"
for arg in "$@"; do
  if [ "$arg" = status ]; then
    if [ "${FAKE_SV_STATE:-run}" = down ]; then
      echo "down: service: 1s, normally up"
    else
      echo "run: service: (pid 42) 10s"
    fi
    exit 0
  fi
done
exit 0
"#;

/// A throwaway host layout: config, sv, service, init and template
/// directories plus a fake `sv` binary.
pub struct RunitHost {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

/// Exit status and combined log output of one `dd-runit` run.
pub struct RunOutput {
    pub success: bool,
    pub log: String,
}

impl RunitHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for sub in ["conf", "sv", "service", "init.d", "tpl", "log", "bin"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        let sv = root.join("bin/sv");
        std::fs::write(&sv, FAKE_SV).unwrap();
        std::fs::set_permissions(&sv, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn write_template(&self, file_name: &str, contents: &str) {
        std::fs::write(self.path("tpl").join(file_name), contents).unwrap();
    }

    /// Write `conf/<name>.yaml` with every directory pointed into the host,
    /// followed by `extra` attributes.
    pub fn write_resource(&self, name: &str, extra: &str) {
        let yaml = format!(
            "templates_dir: {}\nsv_bin: {}\nsv_dir: {}\nservice_dir: {}\nlsb_init_dir: {}\n{extra}",
            self.path("tpl").display(),
            self.path("bin/sv").display(),
            self.path("sv").display(),
            self.path("service").display(),
            self.path("init.d").display(),
        );
        std::fs::write(self.path("conf").join(format!("{name}.yaml")), yaml).unwrap();
    }

    pub fn write_raw_resource(&self, name: &str, yaml: &str) {
        std::fs::write(self.path("conf").join(format!("{name}.yaml")), yaml).unwrap();
    }

    /// Create the `supervise/ok` pipe runsv would create for `rel`
    /// (relative to the sv directory).
    pub fn supervise(&self, rel: &str) {
        make_pipe(&self.path("sv").join(rel).join("supervise/ok"));
    }

    pub fn run(&self, args: &[&str]) -> RunOutput {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> RunOutput {
        let bin = env!("CARGO_BIN_EXE_dd-runit");
        let output = Command::new(bin)
            .arg("--config-dir")
            .arg(self.path("conf"))
            .args(args)
            .envs(env.iter().copied())
            .output()
            .expect("failed to run dd-runit");
        let log = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        eprintln!("[dd-runit] {log}");
        RunOutput {
            success: output.status.success(),
            log,
        }
    }

    /// Every `sv` invocation so far, one argument string per call.
    pub fn sv_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("sv.calls"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn count_calls(&self, verb: &str) -> usize {
        self.sv_calls()
            .iter()
            .filter(|call| call.split_whitespace().any(|arg| arg == verb))
            .count()
    }
}

pub fn make_pipe(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    if !path.exists() {
        mkfifo(path, Mode::from_bits_truncate(0o600)).unwrap();
    }
}

/// Create a named pipe at `path` after `delay`, the way runsv does shortly
/// after a service is linked.
pub fn make_pipe_later(path: PathBuf, delay: Duration) -> JoinHandle<()> {
    std::thread::spawn(move || {
        std::thread::sleep(delay);
        make_pipe(&path);
    })
}
