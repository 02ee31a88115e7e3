// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Test doubles and fixtures shared by unit tests and the e2e suite.
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use crate::config::ServiceConfig;
use crate::control::{CommandOutput, CommandRunner, ControlCommand, Verb};
use crate::platform::Platform;
use crate::readiness::ReadinessPolicy;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every command and replays queued responses. Once the queue is
/// empty every command succeeds with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    responses: Mutex<VecDeque<io::Result<CommandOutput>>>,
    commands: Mutex<Vec<ControlCommand>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose `sv status` calls report the service as running.
    pub fn running() -> Self {
        let runner = Self::new();
        runner.push_response(Ok(CommandOutput::new(0, "run: service: (pid 1) 1s\n")));
        runner
    }

    pub fn push_response(&self, response: io::Result<CommandOutput>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn commands(&self) -> Vec<ControlCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn verbs(&self) -> Vec<Verb> {
        self.commands().into_iter().map(|c| c.verb).collect()
    }

    pub fn count(&self, verb: Verb) -> usize {
        self.verbs().into_iter().filter(|v| *v == verb).count()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

/// Lets a test keep a handle on the recorder it hands to an executor.
impl CommandRunner for Arc<RecordingRunner> {
    fn run(&self, command: &ControlCommand) -> io::Result<CommandOutput> {
        self.as_ref().run(command)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ControlCommand) -> io::Result<CommandOutput> {
        self.commands.lock().unwrap().push(command.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandOutput::new(0, "")))
    }
}

/// A scratch root holding the sv, service, init and template directories of
/// one test.
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: &Path) -> Self {
        let sandbox = Self {
            root: root.to_path_buf(),
        };
        for dir in ["sv", "service", "init.d", "tpl", "log"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        sandbox
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.path("tpl")
    }

    /// A config whose every directory lives inside the sandbox.
    pub fn config(&self) -> ServiceConfig {
        let mut cfg = ServiceConfig::new(self.templates_dir());
        cfg.sv_dir = self.path("sv");
        cfg.service_dir = self.path("service");
        cfg.lsb_init_dir = self.path("init.d");
        cfg.sv_bin = self.path("bin/sv");
        cfg
    }

    pub fn write_template(&self, file_name: &str, contents: &str) {
        std::fs::write(self.templates_dir().join(file_name), contents).unwrap();
    }
}

/// Polls quickly so tests do not sleep for whole seconds.
pub fn fast_readiness(timeout: Duration) -> ReadinessPolicy {
    ReadinessPolicy::new(Duration::from_millis(10), Some(timeout))
}

pub fn generic_platform() -> Platform {
    Platform::other("test")
}
