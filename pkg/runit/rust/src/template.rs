// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// Where a template body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    /// A template shipped with this crate.
    Inline {
        name: &'static str,
        body: &'static str,
    },
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::File(path) => write!(f, "{}", path.display()),
            TemplateSource::Inline { name, .. } => write!(f, "<builtin {name}>"),
        }
    }
}

pub type Variables = BTreeMap<String, String>;

pub trait TemplateRenderer {
    fn render(&self, source: &TemplateSource, variables: &Variables) -> Result<String>;
}

/// Substitutes `<%= name %>` placeholders from the variable map. Any other
/// text is copied through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, source: &TemplateSource, variables: &Variables) -> Result<String> {
        let body = match source {
            TemplateSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| Error::Template {
                    template: source.to_string(),
                    reason: e.to_string(),
                })?
            }
            TemplateSource::Inline { body, .. } => (*body).to_string(),
        };
        substitute(&body, variables).map_err(|reason| Error::Template {
            template: source.to_string(),
            reason,
        })
    }
}

fn substitute(body: &str, variables: &Variables) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some((literal, after_open)) = rest.split_once(OPEN) {
        out.push_str(literal);
        let offset = body.len() - rest.len() + literal.len();
        let (key, after_close) = after_open
            .split_once(CLOSE)
            .ok_or_else(|| format!("unterminated placeholder at byte {offset}"))?;
        let key = key.trim();
        let value = variables
            .get(key)
            .ok_or_else(|| format!("undefined variable '{key}'"))?;
        out.push_str(value);
        rest = after_close;
    }
    out.push_str(rest);
    Ok(out)
}
