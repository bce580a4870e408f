//! Suite run configuration.

use std::time::Duration;

/// Configuration for one suite run.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Task family to run.
    pub task_family: String,

    /// Seed for the suite's task parameterization.
    pub seed: u64,

    /// Number of parameter combinations per task template.
    pub n_task_combinations: u32,

    /// First task index to include when no explicit task list is given.
    pub min_task_idx: usize,

    /// Last task index (exclusive); `None` runs to the end of the list.
    pub max_task_idx: Option<usize>,

    /// Explicit task names to run. Intersected with the environment's known
    /// list; empty means "use the index range instead".
    pub tasks: Vec<String>,

    /// Multiplier from complexity to the step budget.
    pub max_steps_multiplier: u32,

    /// Multiplier from complexity to the wall-clock budget, in seconds.
    pub timeout_multiplier: u32,

    /// Serial of the device under test.
    pub device_serial: String,

    /// Cadence of the overlay keepalive.
    pub keepalive_interval: Duration,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            task_family: "android_world".to_string(),
            seed: 42,
            n_task_combinations: 1,
            min_task_idx: 0,
            max_task_idx: None,
            tasks: Vec::new(),
            max_steps_multiplier: 15,
            timeout_multiplier: 300,
            device_serial: "emulator-5554".to_string(),
            keepalive_interval: Duration::from_secs(5),
        }
    }
}
