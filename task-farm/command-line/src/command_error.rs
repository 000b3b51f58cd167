// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command line is empty")]
    EmptyCommand,

    #[error("cannot split command line: {0}")]
    Parse(String),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("I/O error while running command: {0}")]
    Io(#[from] std::io::Error),
}
