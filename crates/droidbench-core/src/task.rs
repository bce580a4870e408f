//! Task instance identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One concrete, parameterized task instance within a task family.
///
/// Goal and complexity come from the environment when the instance is
/// prepared and do not change for the remainder of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Template name within the task family (e.g. "ContactsAddContact").
    pub name: String,

    /// Index of the parameterized instance.
    pub index: usize,

    /// Natural-language goal the agent is asked to accomplish.
    pub goal: String,

    /// Scalar difficulty rating, used to scale step and time budgets.
    pub complexity: f64,
}

impl TaskSpec {
    /// Create a new TaskSpec.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        goal: impl Into<String>,
        complexity: f64,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            goal: goal.into(),
            complexity,
        }
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.index)
    }
}
