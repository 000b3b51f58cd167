// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod command_error;
pub use command_error::CommandError;

pub mod command_line;
pub use command_line::{CommandLine, CommandRun, RunStatus};

mod command_executor;
pub use command_executor::{CommandExecutor, CommandOutcome, CommandStatus, CommandTask};
