//! Recorded agent trajectories.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observations longer than this are truncated before recording; full UI
/// dumps can run to hundreds of kilobytes per step.
const MAX_OBSERVATION_LEN: usize = 4096;

/// One observe/act pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub step: u32,
    pub observation: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// The recorded sequence of actions and observations for one task attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    /// Create an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one step.
    pub fn push(&mut self, step: u32, observation: &str, action: &str) {
        let mut observation = observation.to_string();
        if observation.len() > MAX_OBSERVATION_LEN {
            observation.truncate(MAX_OBSERVATION_LEN);
        }
        self.steps.push(TrajectoryStep {
            step,
            observation,
            action: action.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The recorded actions, in order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.action.as_str())
    }

    /// Write the trajectory as `trajectory.json` under `dir`, creating the
    /// directory if needed. Returns the written path.
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("trajectory.json");
        let body = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(&path, body)?;
        Ok(path)
    }
}
