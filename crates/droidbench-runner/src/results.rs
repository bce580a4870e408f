//! Result persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use droidbench_agent::Trajectory;
use droidbench_core::TaskResult;

/// Errors while persisting results or trajectories.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for attempt records and trajectories.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist one attempt record.
    async fn persist(&self, result: &TaskResult) -> Result<(), SinkError>;

    /// Persist the trajectory of one attempt.
    async fn persist_trajectory(
        &self,
        task_name: &str,
        task_idx: usize,
        trajectory: &Trajectory,
    ) -> Result<(), SinkError>;
}

/// Sink writing one directory per task under `output_dir`, with
/// `result.json` and `trajectory.json` files inside.
pub struct JsonResultSink {
    output_dir: PathBuf,
}

impl JsonResultSink {
    /// Create a sink rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn task_dir(&self, task_name: &str) -> PathBuf {
        self.output_dir.join(task_name.replace(' ', "_"))
    }

    fn write_json(path: &Path, body: &str) -> Result<(), SinkError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, body)?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonResultSink {
    async fn persist(&self, result: &TaskResult) -> Result<(), SinkError> {
        let path = self.task_dir(&result.task_name).join("result.json");
        let body = serde_json::to_string_pretty(result)?;
        Self::write_json(&path, &body)?;
        debug!(task = %result.task_name, path = %path.display(), "wrote task result");
        Ok(())
    }

    async fn persist_trajectory(
        &self,
        task_name: &str,
        task_idx: usize,
        trajectory: &Trajectory,
    ) -> Result<(), SinkError> {
        let dir = self.task_dir(task_name);
        let path = trajectory.save(&dir)?;
        debug!(task = %task_name, task_idx, path = %path.display(), "wrote task trajectory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidbench_core::{AgentRunPayload, Budget, RunId, TaskSpec};

    fn temp_sink(tag: &str) -> (JsonResultSink, PathBuf) {
        let dir = std::env::temp_dir().join(format!("droidbench-sink-{tag}-{}", std::process::id()));
        (JsonResultSink::new(&dir), dir)
    }

    #[tokio::test]
    async fn test_persist_writes_readable_json() {
        let (sink, dir) = temp_sink("result");

        let spec = TaskSpec::new("System WifiTurnOff", 0, "Turn off wifi", 1.0);
        let budget = Budget::compute(1.0, 15, 300);
        let mut result = TaskResult::new(RunId::generate(), &spec, &budget, "emulator-5554");
        result.record_completed(
            Some(1.0),
            AgentRunPayload {
                steps: 3,
                success: true,
                reason: "done".to_string(),
            },
        );

        sink.persist(&result).await.unwrap();

        // Spaces in the task name become underscores in the directory.
        let body = std::fs::read_to_string(dir.join("System_WifiTurnOff").join("result.json")).unwrap();
        let loaded: TaskResult = serde_json::from_str(&body).unwrap();
        assert_eq!(loaded, result);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_persist_trajectory_writes_beside_result() {
        let (sink, dir) = temp_sink("trajectory");

        let mut trajectory = Trajectory::new();
        trajectory.push(1, "<ui/>", "{\"action\":\"key\",\"keycode\":4}");

        sink.persist_trajectory("SystemWifiTurnOff", 0, &trajectory)
            .await
            .unwrap();

        assert!(dir.join("SystemWifiTurnOff").join("trajectory.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
