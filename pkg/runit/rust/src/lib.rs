// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod action;
pub mod config;
pub mod control;
pub mod errors;
pub mod executor;
pub mod layout;
pub mod orchestrator;
pub mod platform;
pub mod readiness;
pub mod resource;
pub mod service;
pub mod state;
pub mod template;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use action::Action;
pub use errors::{Error, Result};
pub use executor::{Executor, PassReport};
pub use service::Service;
