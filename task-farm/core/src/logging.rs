// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::LogConfig;
use crate::error::FarmError;
use crate::types::{Rank, CONTROLLER_RANK};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the process-wide subscriber: stdout always, plus the log file
/// when one is configured. `RUST_LOG` overrides the configured level.
pub fn init(config: &LogConfig) -> Result<(), FarmError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| FarmError::Config(format!("log level '{}': {}", config.level, e)))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| FarmError::Config(format!("{}: {}", path.display(), e)))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| FarmError::Logging(e.to_string()))
}

/// Span that scopes every log line of one process's loop.
pub fn role_span(rank: Rank) -> Span {
    if rank == CONTROLLER_RANK {
        tracing::info_span!("controller")
    } else {
        tracing::info_span!("worker", rank)
    }
}
