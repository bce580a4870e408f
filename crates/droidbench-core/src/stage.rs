//! Lifecycle stages of a single task attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages a task attempt moves through, in order.
///
/// Each stage has its own failure policy: `Reset` failures are fatal to the
/// whole suite, `Prepare`/`Initialize`/`EnableCapability` failures abort the
/// single attempt, `Run` failures are recorded in the attempt's result, and
/// `Score`/`Persist`/`TearDown` failures are soft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Full environment reset back to the home state.
    Reset,
    /// Fetching the instance's goal and complexity.
    Prepare,
    /// Asking the environment to instantiate the task variant.
    Initialize,
    /// (Re-)enabling the device-side accessibility capability.
    EnableCapability,
    /// Driving the agent against the live device.
    Run,
    /// Fetching the numeric task score.
    Score,
    /// Persisting the agent's trajectory.
    Persist,
    /// Tearing the task instance down.
    TearDown,
}

impl Stage {
    /// Stable label used in notifications and result records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Prepare => "prepare",
            Self::Initialize => "initialize",
            Self::EnableCapability => "enable_capability",
            Self::Run => "run",
            Self::Score => "score",
            Self::Persist => "persist_trajectory",
            Self::TearDown => "tear_down",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(Stage::Initialize.label(), "initialize");
        assert_eq!(Stage::EnableCapability.label(), "enable_capability");
        assert_eq!(format!("{}", Stage::TearDown), "tear_down");
    }
}
