// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::debug;
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    /// Debian and derivatives: init scripts are real LSB scripts.
    Debian,
    Other,
}

/// The host platform, passed to the executor at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub id: String,
    pub family: PlatformFamily,
}

impl Platform {
    pub fn debian(id: &str) -> Self {
        Self {
            id: id.to_string(),
            family: PlatformFamily::Debian,
        }
    }

    pub fn other(id: &str) -> Self {
        Self {
            id: id.to_string(),
            family: PlatformFamily::Other,
        }
    }

    /// Identify the running host from `/etc/os-release`, falling back to a
    /// non-Debian platform when the file is missing.
    pub fn detect() -> Self {
        Self::from_os_release(Path::new(OS_RELEASE))
    }

    pub fn from_os_release(path: &Path) -> Self {
        let vars = match std::fs::read_to_string(path) {
            Ok(contents) => parse_os_release(&contents),
            Err(e) => {
                debug!("could not read {}: {e}", path.display());
                return Self::other("unknown");
            }
        };

        let id = vars
            .iter()
            .find(|(k, _)| k == "ID")
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let like = vars
            .iter()
            .find(|(k, _)| k == "ID_LIKE")
            .map(|(_, v)| v.as_str())
            .unwrap_or("");

        let debian_like = id == "debian"
            || id == "ubuntu"
            || like.split_whitespace().any(|l| l == "debian" || l == "ubuntu");
        if debian_like {
            Self::debian(&id)
        } else {
            Self::other(&id)
        }
    }

    pub fn is_debian(&self) -> bool {
        self.family == PlatformFamily::Debian
    }
}

/// Parse `KEY=VALUE` lines, stripping quotes and skipping comments, blank
/// lines and lines without `=`.
fn parse_os_release(contents: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, raw_val)) = trimmed.split_once('=') {
            let val = raw_val
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            vars.push((key.trim().to_string(), val));
        }
    }
    vars
}
