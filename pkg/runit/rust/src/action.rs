// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::Error;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Actions a runit service resource can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Write the service configuration and link it into the service directory.
    Enable,
    /// Send SIGHUP through `sv hup`.
    Hup,
    /// Send SIGINT through `sv int`.
    Int,
    /// Send SIGTERM through `sv term`.
    Term,
    /// Unconditionally `sv restart`.
    Restart,
    /// Zero-effect pass.
    Nothing,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Enable,
        Action::Hup,
        Action::Int,
        Action::Term,
        Action::Restart,
        Action::Nothing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Hup => "hup",
            Action::Int => "int",
            Action::Term => "term",
            Action::Restart => "restart",
            Action::Nothing => "nothing",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::UnsupportedAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// The `action` attribute accepts a single action or a list of them.
pub(crate) fn deserialize_actions<'de, D>(deserializer: D) -> Result<Vec<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Action),
        Many(Vec<Action>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(action) => vec![action],
        OneOrMany::Many(actions) => actions,
    })
}
