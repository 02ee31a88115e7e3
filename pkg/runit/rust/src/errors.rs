// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unhandled action: '{0}'")]
    UnsupportedAction(String),

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: &'static str, reason: String },

    /// A handler read a current attribute that was not probed for its action.
    #[error("current attribute '{0}' was not probed for this action")]
    Unprobed(&'static str),

    #[error("failed to execute `{command}`: {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("timed out after {}s waiting for {}", .waited.as_secs(), .path.display())]
    ReadinessTimeout { path: PathBuf, waited: Duration },

    #[error("failed to converge {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render template {template}: {reason}")]
    Template { template: String, reason: String },
}

impl Error {
    pub(crate) fn resource(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Resource { path, source }
    }
}
