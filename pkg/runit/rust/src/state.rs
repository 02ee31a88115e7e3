// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::action::Action;
use crate::control::ServiceControl;
use crate::errors::{Error, Result};
use crate::service::Service;
use std::fmt;

/// Action flags requested for one convergence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DesiredState {
    pub enabled: bool,
    pub hupped: bool,
    pub inted: bool,
    pub termed: bool,
    pub restarted: bool,
}

impl DesiredState {
    pub fn for_action(action: Action) -> Self {
        let mut desired = DesiredState::default();
        match action {
            Action::Enable => desired.enabled = true,
            Action::Hup => desired.hupped = true,
            Action::Int => desired.inted = true,
            Action::Term => desired.termed = true,
            Action::Restart => desired.restarted = true,
            Action::Nothing => {}
        }
        desired
    }

    pub fn is_empty(&self) -> bool {
        *self == DesiredState::default()
    }
}

/// Observed state. Only the attributes probed for the pass's action are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentState {
    enabled: Option<bool>,
    running: Option<bool>,
    hupped: Option<bool>,
    inted: Option<bool>,
    termed: Option<bool>,
    restarted: Option<bool>,
}

impl CurrentState {
    /// Probe the live system for the attributes `action` depends on.
    pub fn probe(action: Action, service: &Service, control: &ServiceControl<'_>) -> Self {
        let mut current = CurrentState::default();
        match action {
            Action::Enable => {
                current.enabled = Some(service.service_dir_name().join("run").exists());
            }
            Action::Hup => {
                current.hupped = Some(false);
                current.running = Some(control.is_running());
            }
            Action::Int => {
                current.inted = Some(false);
                current.running = Some(control.is_running());
            }
            Action::Term => {
                current.termed = Some(false);
                current.running = Some(control.is_running());
            }
            Action::Restart => current.restarted = Some(false),
            Action::Nothing => {}
        }
        current
    }

    pub fn enabled(&self) -> Result<bool> {
        self.enabled.ok_or(Error::Unprobed("enabled"))
    }

    pub fn running(&self) -> Result<bool> {
        self.running.ok_or(Error::Unprobed("running"))
    }

    pub fn hupped(&self) -> Option<bool> {
        self.hupped
    }

    pub fn inted(&self) -> Option<bool> {
        self.inted
    }

    pub fn termed(&self) -> Option<bool> {
        self.termed
    }

    pub fn restarted(&self) -> Option<bool> {
        self.restarted
    }

    #[cfg(test)]
    pub(crate) fn with_running(running: bool) -> Self {
        CurrentState {
            running: Some(running),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn with_enabled(enabled: bool) -> Self {
        CurrentState {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn and_running(self, running: bool) -> Self {
        CurrentState {
            running: Some(running),
            ..self
        }
    }
}

impl fmt::Display for CurrentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("enabled", self.enabled),
            ("running", self.running),
            ("hupped", self.hupped),
            ("inted", self.inted),
            ("termed", self.termed),
            ("restarted", self.restarted),
        ];
        let mut first = true;
        for (name, value) in fields {
            if let Some(value) = value {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={value}")?;
                first = false;
            }
        }
        if first {
            f.write_str("(none)")?;
        }
        Ok(())
    }
}
