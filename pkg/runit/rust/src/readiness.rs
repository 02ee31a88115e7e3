// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::{Error, Result};
use log::debug;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for runsv to create `supervise/ok` after a service is
/// linked into the service directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    /// None waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl ReadinessPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    /// Block until `path` is a named pipe or the timeout elapses.
    pub fn wait_for_pipe(&self, path: &Path) -> Result<()> {
        let start = Instant::now();
        loop {
            if is_pipe(path) {
                debug!("{} is ready", path.display());
                return Ok(());
            }
            let mut nap = self.interval;
            if let Some(timeout) = self.timeout {
                let left = timeout.saturating_sub(start.elapsed());
                if left.is_zero() {
                    return Err(Error::ReadinessTimeout {
                        path: path.to_path_buf(),
                        waited: start.elapsed(),
                    });
                }
                // Never sleep past the deadline.
                nap = nap.min(left);
            }
            debug!("waiting for named pipe {}", path.display());
            std::thread::sleep(nap);
        }
    }
}

fn is_pipe(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.file_type().is_fifo())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    fn policy(timeout_ms: u64) -> ReadinessPolicy {
        ReadinessPolicy::new(
            Duration::from_millis(5),
            Some(Duration::from_millis(timeout_ms)),
        )
    }

    #[test]
    fn test_existing_pipe_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok");
        mkfifo(&ok, Mode::from_bits_truncate(0o600)).unwrap();
        policy(10).wait_for_pipe(&ok).unwrap();
    }

    #[test]
    fn test_times_out_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("supervise/ok");
        match policy(50).wait_for_pipe(&ok) {
            Err(Error::ReadinessTimeout { path, waited }) => {
                assert_eq!(path, ok);
                assert!(waited >= Duration::from_millis(50));
            }
            other => panic!("expected ReadinessTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_regular_file_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok");
        std::fs::write(&ok, "").unwrap();
        assert!(policy(30).wait_for_pipe(&ok).is_err());
    }

    #[test]
    fn test_resolves_once_pipe_appears() {
        let dir = tempfile::tempdir().unwrap();
        let supervise = dir.path().join("supervise");
        let ok = supervise.join("ok");
        let creator = {
            let supervise = supervise.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                std::fs::create_dir_all(&supervise).unwrap();
                mkfifo(&supervise.join("ok"), Mode::from_bits_truncate(0o600)).unwrap();
            })
        };
        policy(5_000).wait_for_pipe(&ok).unwrap();
        creator.join().unwrap();
    }

    #[test]
    fn test_timeout_shorter_than_interval() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok");
        let policy = ReadinessPolicy::new(
            Duration::from_secs(1),
            Some(Duration::from_millis(100)),
        );
        match policy.wait_for_pipe(&ok) {
            Err(Error::ReadinessTimeout { waited, .. }) => {
                assert!(waited >= Duration::from_millis(100));
                assert!(waited < Duration::from_millis(900), "waited {waited:?}");
            }
            other => panic!("expected ReadinessTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_checks_once() {
        let dir = tempfile::tempdir().unwrap();
        let ok = dir.path().join("ok");
        let policy = ReadinessPolicy::new(Duration::from_secs(1), Some(Duration::ZERO));
        let start = Instant::now();
        assert!(policy.wait_for_pipe(&ok).is_err());
        assert!(start.elapsed() < Duration::from_millis(500));

        mkfifo(&ok, Mode::from_bits_truncate(0o600)).unwrap();
        policy.wait_for_pipe(&ok).unwrap();
    }

    #[test]
    fn test_default_policy() {
        let policy = ReadinessPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Some(Duration::from_secs(60)));
    }
}
