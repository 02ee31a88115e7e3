// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! On-disk layout of a runit service: the sv directory with its scripts, the
//! init compatibility entry, and the service directory links.

use crate::errors::Result;
use crate::orchestrator::ChildResources;
use crate::platform::Platform;
use crate::readiness::ReadinessPolicy;
use crate::resource::{ChildResource, Ownership};
use crate::service::Service;
use crate::template::TemplateSource;
use log::{debug, info};
use std::path::PathBuf;

const SCRIPT_MODE: u32 = 0o755;
const DATA_MODE: u32 = 0o644;

const LSB_INIT_TEMPLATE: &str = r#"#!/bin/sh
### BEGIN INIT INFO
# Provides:          <%= service_name %>
# Required-Start:    $remote_fs $syslog
# Required-Stop:     $remote_fs $syslog
# Default-Start:     2 3 4 5
# Default-Stop:      0 1 6
# Short-Description: runit service <%= service_name %>
### END INIT INFO

case "$1" in
  start|stop|restart|status|reload|force-reload|force-stop|force-restart|force-shutdown|try-restart)
    exec <%= sv_bin %> "$1" <%= service_dir %>
    ;;
  *)
    echo "Usage: $0 {start|stop|restart|status|reload|force-reload}" >&2
    exit 1
    ;;
esac
"#;

/// Change flags `action_enable` consults after configuring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Configured {
    pub run_script: bool,
    pub log_run_script: bool,
    pub log_config: bool,
}

impl Configured {
    pub fn log_changed(&self) -> bool {
        self.log_run_script || self.log_config
    }
}

/// Builds the children of one service.
pub struct Layout<'a> {
    service: &'a Service,
    platform: &'a Platform,
    ownership: Ownership,
}

impl<'a> Layout<'a> {
    pub fn new(service: &'a Service, platform: &'a Platform) -> Self {
        Self {
            service,
            platform,
            ownership: Ownership {
                owner: service.owner.clone(),
                group: service.group.clone(),
            },
        }
    }

    fn sv_path(&self, rel: &str) -> PathBuf {
        self.service.sv_dir_name().join(rel)
    }

    fn directory(&self, path: PathBuf) -> ChildResource {
        ChildResource::directory(path).owned_by(&self.ownership)
    }

    fn file(&self, path: PathBuf, content: String, mode: u32) -> ChildResource {
        ChildResource::file(path, content, mode).owned_by(&self.ownership)
    }

    fn template(&self, path: PathBuf, template_name: &str, suffix: &str) -> ChildResource {
        let source = TemplateSource::File(self.service.template_path(template_name, suffix));
        ChildResource::template(
            path,
            source,
            self.service.template_variables(),
            SCRIPT_MODE,
        )
        .owned_by(&self.ownership)
    }

    pub fn run_script(&self) -> ChildResource {
        self.template(self.sv_path("run"), &self.service.run_template_name, "run")
    }

    pub fn log_run_script(&self) -> ChildResource {
        let path = self.sv_path("log/run");
        if self.service.default_logger {
            let script = format!(
                "#!/bin/sh\nexec svlogd -tt {}",
                self.service.log_dir.display()
            );
            self.file(path, script, SCRIPT_MODE)
        } else {
            self.template(path, &self.service.log_template_name, "log-run")
        }
    }

    pub fn log_config(&self) -> ChildResource {
        self.file(
            self.sv_path("log/config"),
            self.service.log_config.render(),
            DATA_MODE,
        )
    }

    /// Materialize the service configuration. Children run in a fixed order
    /// and the first failure aborts the rest.
    pub fn configure(&self, children: &mut ChildResources<'_>) -> Result<Configured> {
        let svc = self.service;
        let prefix = svc.log_prefix();

        if svc.sv_templates {
            children.converge(self.directory(svc.sv_dir_name()))?;
            children.converge(self.run_script())?;

            if svc.log {
                children.converge(self.directory(self.sv_path("log")))?;
                children.converge(self.directory(self.sv_path("log/main")))?;
                if svc.default_logger {
                    children.converge(self.directory(svc.log_dir.clone()))?;
                }
                children.converge(self.log_run_script())?;
                children.converge(self.log_config())?;
            }

            if !svc.env.is_empty() {
                children.converge(self.directory(svc.env_dir()))?;
                for (var, value) in &svc.env {
                    children.converge(self.file(svc.env_dir().join(var), value.clone(), DATA_MODE))?;
                }
            }

            if svc.check {
                children.converge(self.template(
                    self.sv_path("check"),
                    &svc.check_script_template_name,
                    "check",
                ))?;
            }

            if svc.finish {
                children.converge(self.template(
                    self.sv_path("finish"),
                    &svc.finish_script_template_name,
                    "finish",
                ))?;
            }

            if !svc.control.is_empty() {
                children.converge(self.directory(self.sv_path("control")))?;
                for signal in &svc.control {
                    children.converge(self.template(
                        self.sv_path("control").join(signal),
                        svc.control_template_name(signal),
                        signal,
                    ))?;
                }
            }
        } else {
            debug!("{prefix} sv_templates disabled, leaving {} alone", svc.sv_dir_name().display());
        }

        self.configure_init_entry(children)?;
        info!("{prefix} configured");

        Ok(Configured {
            run_script: children.changed(&self.run_script().key()),
            log_run_script: svc.log && children.changed(&self.log_run_script().key()),
            log_config: svc.log && children.changed(&self.log_config().key()),
        })
    }

    fn configure_init_entry(&self, children: &mut ChildResources<'_>) -> Result<()> {
        let path = self.service.lsb_init_path();
        if self.platform.is_debian() {
            children.converge(ChildResource::remove_link(path))?;
            children.converge(self.lsb_init_script())?;
        } else {
            children.converge(ChildResource::link(path, self.service.sv_bin.clone()))?;
        }
        Ok(())
    }

    /// The Debian init script. Root runs it, so it keeps the default
    /// ownership rather than the service's.
    fn lsb_init_script(&self) -> ChildResource {
        ChildResource::template(
            self.service.lsb_init_path(),
            TemplateSource::Inline {
                name: "lsb-init",
                body: LSB_INIT_TEMPLATE,
            },
            self.service.template_variables(),
            SCRIPT_MODE,
        )
    }

    /// Link the service into the supervised directory and wait for runsv to
    /// pick it up.
    pub fn enable_service(
        &self,
        children: &mut ChildResources<'_>,
        readiness: &ReadinessPolicy,
    ) -> Result<()> {
        let svc = self.service;
        children.converge(ChildResource::link(svc.service_dir_name(), svc.sv_dir_name()))?;
        if svc.log {
            children.converge(ChildResource::link(
                self.sv_path("log/main/config"),
                self.sv_path("log/config"),
            ))?;
        }

        readiness.wait_for_pipe(&svc.service_dir_name().join("supervise/ok"))?;
        if svc.log {
            readiness.wait_for_pipe(&svc.service_dir_name().join("log/supervise/ok"))?;
        }
        info!("{} enabled", svc.log_prefix());
        Ok(())
    }
}
