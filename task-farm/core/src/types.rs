// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// Process identity assigned by the transport for the whole run.
pub type Rank = usize;

/// Rank of a worker process, always in `1..=N`.
pub type WorkerId = Rank;

pub const CONTROLLER_RANK: Rank = 0;
