// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dd_runit::config::{LoadedConfigs, ServiceConfig, config_dir, load_configs};
use dd_runit::{Action, Executor, Service};
use log::{error, info};
use std::path::PathBuf;

/// Converge runit services described by YAML resources.
#[derive(Parser, Debug)]
#[command(name = "dd-runit", version)]
struct Cli {
    /// Directory holding one `<name>.yaml` per service. Defaults to
    /// `DD_RUNIT_CONFIG_DIR` or /etc/datadog-agent/runit.d.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Run this action for every selected service instead of the configured ones.
    #[arg(long)]
    action: Option<String>,

    /// Only converge the resource with this name.
    #[arg(long)]
    service: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;
    info!("dd-runit starting (version {})", env!("CARGO_PKG_VERSION"));

    // Reject unknown actions before touching anything.
    let action = cli
        .action
        .as_deref()
        .map(str::parse::<Action>)
        .transpose()?;

    let dir = cli.config_dir.unwrap_or_else(config_dir);
    let LoadedConfigs {
        services: mut configs,
        mut skipped,
    } = load_configs(&dir)?;
    if let Some(ref wanted) = cli.service {
        configs.retain(|(name, _)| name == wanted);
        skipped.retain(|file| file.path.file_stem().is_some_and(|stem| stem == wanted.as_str()));
        if configs.is_empty() && skipped.is_empty() {
            bail!("no resource named '{wanted}' in {}", dir.display());
        }
    }
    if configs.is_empty() && skipped.is_empty() {
        info!("no service resources in {}", dir.display());
        return Ok(());
    }

    let executor = Executor::system();
    let total = configs.len() + skipped.len();
    let mut failures = skipped.len();
    for (name, config) in configs {
        if let Err(e) = converge(&executor, &name, config, action) {
            error!("[{name}] {e:#}");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!(
            "{failures} of {total} service resource(s) failed to converge ({} file(s) could not be loaded)",
            skipped.len()
        );
    }
    info!("converged {total} service resource(s)");
    Ok(())
}

fn converge(
    executor: &Executor,
    name: &str,
    config: ServiceConfig,
    action: Option<Action>,
) -> Result<()> {
    let service = Service::from_config(name, config).context("invalid resource")?;
    match action {
        Some(action) => {
            executor.execute(&service, action)?;
        }
        None => {
            executor.run(&service)?;
        }
    }
    Ok(())
}
