//! Tagged outcome of one task attempt.

use crate::{Stage, TaskResult};

/// What became of a single task attempt.
///
/// The lifecycle controller always returns one of these for a non-fatal
/// attempt; only environment-reset failures surface as errors. An `Aborted`
/// attempt produced no result record and the suite simply moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The attempt ran to the end of its lifecycle and produced a record,
    /// successful or not.
    Completed(TaskResult),

    /// The attempt was abandoned before the agent ran.
    Aborted {
        /// Stage the attempt died in.
        stage: Stage,
        /// Human-readable failure detail.
        detail: String,
    },
}

impl TaskOutcome {
    /// The result record, if the attempt produced one.
    pub fn result(&self) -> Option<&TaskResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Aborted { .. } => None,
        }
    }

    /// Returns true if the attempt was abandoned before running.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
