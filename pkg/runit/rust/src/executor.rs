// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Convergence of one runit service.
//!
//! A pass takes one action, derives the desired flags from it, probes the
//! current state the action depends on, then runs the handlers whose desired
//! flag is set in the order term, enable, hup, int, restart.

use crate::action::Action;
use crate::control::{CommandRunner, ServiceControl, SystemRunner, Verb};
use crate::errors::Result;
use crate::layout::Layout;
use crate::orchestrator::ChildResources;
use crate::platform::Platform;
use crate::readiness::ReadinessPolicy;
use crate::service::Service;
use crate::state::{CurrentState, DesiredState};
use crate::template::{PlaceholderRenderer, TemplateRenderer};
use log::{debug, info};

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub action: Option<Action>,
    /// Children whose convergence changed the filesystem.
    pub changed_children: usize,
    pub enabled: bool,
    pub restarted: bool,
    pub log_restarted: bool,
    pub signaled: Option<Verb>,
}

pub struct Executor {
    runner: Box<dyn CommandRunner>,
    renderer: Box<dyn TemplateRenderer>,
    platform: Platform,
    readiness: Option<ReadinessPolicy>,
}

impl Executor {
    pub fn new(
        runner: Box<dyn CommandRunner>,
        renderer: Box<dyn TemplateRenderer>,
        platform: Platform,
    ) -> Self {
        Self {
            runner,
            renderer,
            platform,
            readiness: None,
        }
    }

    /// Executor for the running host: spawns `sv` and detects the platform.
    pub fn system() -> Self {
        Self::new(
            Box::new(SystemRunner),
            Box::new(PlaceholderRenderer),
            Platform::detect(),
        )
    }

    /// Replace the per-service readiness policy, mostly for tests that cannot
    /// afford a one second poll interval.
    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = Some(readiness);
        self
    }

    fn readiness_for(&self, service: &Service) -> ReadinessPolicy {
        self.readiness.unwrap_or(ReadinessPolicy {
            timeout: service.readiness_timeout,
            ..ReadinessPolicy::default()
        })
    }

    fn pass<'a>(&'a self, service: &'a Service, action: Action) -> Pass<'a> {
        Pass {
            service,
            control: ServiceControl::new(service, self.runner.as_ref()),
            layout: Layout::new(service, &self.platform),
            children: ChildResources::new(self.renderer.as_ref()),
            readiness: self.readiness_for(service),
            report: PassReport {
                action: Some(action),
                ..Default::default()
            },
        }
    }

    /// Parse `action` and run one pass. An unknown name fails before any
    /// probe or side effect.
    pub fn run_action(&self, service: &Service, action: &str) -> Result<PassReport> {
        let action: Action = action.parse()?;
        self.execute(service, action)
    }

    /// Run one pass per configured action, stopping at the first failure.
    pub fn run(&self, service: &Service) -> Result<Vec<PassReport>> {
        service
            .actions
            .iter()
            .map(|action| self.execute(service, *action))
            .collect()
    }

    pub fn execute(&self, service: &Service, action: Action) -> Result<PassReport> {
        let prefix = service.log_prefix();
        let desired = DesiredState::for_action(action);
        if desired.is_empty() {
            debug!("{prefix} action {action}: nothing to do");
            return Ok(PassReport {
                action: Some(action),
                ..Default::default()
            });
        }

        let mut pass = self.pass(service, action);
        let current = CurrentState::probe(action, service, &pass.control);
        debug!("{prefix} action {action}: current state {current}");

        pass.apply(&desired, &current)?;
        pass.report.changed_children = pass.children.changed_count();
        Ok(pass.report)
    }
}

/// State owned by one convergence pass.
struct Pass<'a> {
    service: &'a Service,
    control: ServiceControl<'a>,
    layout: Layout<'a>,
    children: ChildResources<'a>,
    readiness: ReadinessPolicy,
    report: PassReport,
}

impl Pass<'_> {
    fn apply(&mut self, desired: &DesiredState, current: &CurrentState) -> Result<()> {
        if desired.termed {
            self.signal_if_running(Verb::Term, current)?;
        }
        if desired.enabled {
            self.action_enable(current)?;
        }
        if desired.hupped {
            self.signal_if_running(Verb::Hup, current)?;
        }
        if desired.inted {
            self.signal_if_running(Verb::Int, current)?;
        }
        if desired.restarted {
            self.action_restart()?;
        }
        Ok(())
    }

    fn action_enable(&mut self, current: &CurrentState) -> Result<()> {
        let prefix = self.service.log_prefix();
        let configured = self.layout.configure(&mut self.children)?;

        if current.enabled()? {
            debug!("{prefix} already enabled - nothing to do");
        } else {
            self.layout
                .enable_service(&mut self.children, &self.readiness)?;
            self.report.enabled = true;
        }

        if self.service.restart_on_update {
            if configured.run_script {
                info!("{prefix} run script changed, restarting");
                self.control.restart()?;
                self.report.restarted = true;
            }
            if self.service.log && configured.log_changed() {
                info!("{prefix} log configuration changed, restarting log service");
                self.control.restart_log()?;
                self.report.log_restarted = true;
            }
        }
        Ok(())
    }

    fn signal_if_running(&mut self, verb: Verb, current: &CurrentState) -> Result<()> {
        if current.running()? {
            self.control.send_signal(verb)?;
            self.report.signaled = Some(verb);
        } else {
            debug!("{} not running - nothing to do", self.service.log_prefix());
        }
        Ok(())
    }

    fn action_restart(&mut self) -> Result<()> {
        self.control.restart()?;
        self.report.restarted = true;
        Ok(())
    }
}
