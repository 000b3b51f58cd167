// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use task_farm_core::Rank;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidVar { name: &'static str, value: String },

    #[error("a run needs a controller and at least one worker, got size {0}")]
    InvalidSize(usize),

    #[error("rank {rank} is outside a run of size {size}")]
    RankOutOfRange { rank: Rank, size: usize },

    #[error("failed to start rank {rank}: {source}")]
    Spawn {
        rank: Rank,
        #[source]
        source: std::io::Error,
    },

    #[error("rank {rank} exited with {}", describe_code(*.code))]
    RankFailed { rank: Rank, code: Option<i32> },

    #[error("launcher I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}
