// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::{Error, Result};
use crate::service::Service;
use log::{debug, info};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// `sv` subcommands used by the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Status,
    Restart,
    Hup,
    Int,
    Term,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Status => "status",
            Verb::Restart => "restart",
            Verb::Hup => "hup",
            Verb::Int => "int",
            Verb::Term => "term",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `sv` invocation: `<sv_bin> [-w <timeout>] [-v] <verb> <target>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    pub sv_bin: PathBuf,
    pub timeout: Option<u64>,
    pub verbose: bool,
    pub verb: Verb,
    pub target: PathBuf,
}

impl ControlCommand {
    pub fn new(service: &Service, verb: Verb, target: PathBuf) -> Self {
        Self {
            sv_bin: service.sv_bin.clone(),
            timeout: service.sv_timeout,
            verbose: service.sv_verbose,
            verb,
            target,
        }
    }

    /// Arguments passed to `sv_bin`, without any shell in between.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(5);
        if let Some(timeout) = self.timeout {
            args.push("-w".into());
            args.push(timeout.to_string().into());
        }
        if self.verbose {
            args.push("-v".into());
        }
        args.push(self.verb.as_str().into());
        args.push(self.target.clone().into_os_string());
        args
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.sv_bin.display())?;
        if let Some(timeout) = self.timeout {
            write!(f, "-w '{timeout}' ")?;
        }
        if self.verbose {
            f.write_str("-v ")?;
        }
        write!(f, "{} {}", self.verb, self.target.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// None when the command was killed by a signal.
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_status: i32, stdout: &str) -> Self {
        Self {
            exit_status: Some(exit_status),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Executes control commands.
pub trait CommandRunner {
    fn run(&self, command: &ControlCommand) -> std::io::Result<CommandOutput>;
}

/// Production runner that spawns `sv_bin` directly.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ControlCommand) -> std::io::Result<CommandOutput> {
        let output = Command::new(&command.sv_bin)
            .args(command.args())
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            exit_status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `sv` operations against one service.
pub struct ServiceControl<'a> {
    service: &'a Service,
    runner: &'a dyn CommandRunner,
}

impl<'a> ServiceControl<'a> {
    pub fn new(service: &'a Service, runner: &'a dyn CommandRunner) -> Self {
        Self { service, runner }
    }

    fn command(&self, verb: Verb) -> ControlCommand {
        ControlCommand::new(self.service, verb, self.service.service_dir_name())
    }

    /// True only when `sv status` exits 0 and reports `run:`. Any failure,
    /// including a failure to spawn `sv`, counts as not running.
    pub fn is_running(&self) -> bool {
        let command = self.command(Verb::Status);
        match self.runner.run(&command) {
            Ok(output) => output.success() && output.stdout.starts_with("run:"),
            Err(e) => {
                debug!(
                    "{} status check `{command}` failed: {e}",
                    self.service.log_prefix()
                );
                false
            }
        }
    }

    pub fn restart(&self) -> Result<()> {
        self.run_checked(&self.command(Verb::Restart))?;
        info!("{} restarted", self.service.log_prefix());
        Ok(())
    }

    pub fn restart_log(&self) -> Result<()> {
        let command = ControlCommand::new(
            self.service,
            Verb::Restart,
            self.service.service_dir_name().join("log"),
        );
        self.run_checked(&command)?;
        info!("{} log service restarted", self.service.log_prefix());
        Ok(())
    }

    pub fn send_signal(&self, verb: Verb) -> Result<()> {
        self.run_checked(&self.command(verb))?;
        info!("{} sent {verb}", self.service.log_prefix());
        Ok(())
    }

    fn run_checked(&self, command: &ControlCommand) -> Result<CommandOutput> {
        debug!("{} executing `{command}`", self.service.log_prefix());
        let output = self
            .runner
            .run(command)
            .map_err(|source| Error::CommandExecution {
                command: command.to_string(),
                source,
            })?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: output
                    .exit_status
                    .map_or_else(|| "signal".to_string(), |code| format!("status {code}")),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
