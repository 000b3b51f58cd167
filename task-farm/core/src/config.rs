// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::FarmError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pacing and logging settings, loaded from JSON.
/// Every field is optional; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    /// Pause at the end of every dispatching iteration
    pub poll_interval_ms: u64,
    /// Pause between checks while waiting for busy workers after termination
    pub drain_interval_ms: u64,
    /// Pause after each work assignment
    pub dispatch_delay_ms: u64,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Used when RUST_LOG is not set
    pub level: String,
    /// Also append log lines to this file
    pub file: Option<PathBuf>,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            drain_interval_ms: 1000,
            dispatch_delay_ms: 0,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl FarmConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FarmError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| FarmError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| FarmError::Config(format!("{}: {}", path.display(), e)))
    }

    /// No pacing at all. Loops still yield between iterations.
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 0,
            drain_interval_ms: 0,
            dispatch_delay_ms: 0,
            log: LogConfig::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }
}
