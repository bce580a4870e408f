//! Per-attempt outcome records.

use crate::{Budget, RunId, TaskSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw payload returned by the agent runtime for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunPayload {
    /// Steps the agent actually took.
    pub steps: u32,

    /// Whether the agent itself considered the goal accomplished.
    pub success: bool,

    /// The agent's final thought or failure reason.
    pub reason: String,
}

impl AgentRunPayload {
    /// Payload synthesized when the agent run timed out.
    pub fn timed_out(steps: u32, reason: impl Into<String>) -> Self {
        Self {
            steps,
            success: false,
            reason: reason.into(),
        }
    }
}

/// Outcome record for a single task attempt.
///
/// Created when the attempt enters the run stage and finalized exactly once;
/// the suite orchestrator owns the record until it is handed to the result
/// sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Suite run this attempt belongs to.
    pub run_id: RunId,

    /// Task template name.
    pub task_name: String,

    /// Parameterized instance index.
    pub task_index: usize,

    /// Goal the agent was asked to accomplish.
    pub goal: String,

    /// Step budget the attempt ran under.
    pub max_steps: u32,

    /// Numeric score reported by the environment, when it could be fetched.
    pub score: Option<f64>,

    /// Whether the agent reported success.
    pub success: bool,

    /// Failure reason for unsuccessful attempts.
    pub reason: Option<String>,

    /// Raw error description when the agent run failed outright.
    pub error: Option<String>,

    /// Raw agent result payload, when one was produced.
    pub agent_payload: Option<AgentRunPayload>,

    /// Serial of the device the attempt ran on.
    pub device_serial: String,

    /// When the attempt entered the run stage.
    pub started_at: DateTime<Utc>,

    /// When the outcome was recorded.
    pub finished_at: Option<DateTime<Utc>>,

    /// Wall-clock seconds between start and finish.
    pub execution_secs: f64,
}

impl TaskResult {
    /// Create a new record for an attempt that is about to run.
    pub fn new(run_id: RunId, spec: &TaskSpec, budget: &Budget, device_serial: impl Into<String>) -> Self {
        Self {
            run_id,
            task_name: spec.name.clone(),
            task_index: spec.index,
            goal: spec.goal.clone(),
            max_steps: budget.max_steps,
            score: None,
            success: false,
            reason: None,
            error: None,
            agent_payload: None,
            device_serial: device_serial.into(),
            started_at: Utc::now(),
            finished_at: None,
            execution_secs: 0.0,
        }
    }

    /// Record a normally completed agent run.
    pub fn record_completed(&mut self, score: Option<f64>, payload: AgentRunPayload) {
        self.score = score;
        self.success = payload.success;
        self.reason = Some(payload.reason.clone());
        self.agent_payload = Some(payload);
        self.finalize();
    }

    /// Record a timed-out agent run. The environment may have scored partial
    /// progress, so a score can still be attached.
    pub fn record_timeout(&mut self, score: Option<f64>, steps: u32, reason: impl Into<String>) {
        let reason = reason.into();
        self.score = score;
        self.success = false;
        self.reason = Some(reason.clone());
        self.agent_payload = Some(AgentRunPayload::timed_out(steps, reason));
        self.finalize();
    }

    /// Record an agent run that failed with an error other than timeout.
    /// No score is attached on this path.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
        self.finalize();
    }

    fn finalize(&mut self) {
        let now = Utc::now();
        self.execution_secs = (now - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.finished_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TaskResult {
        let spec = TaskSpec::new("SystemWifiTurnOff", 0, "Turn off wifi", 1.0);
        let budget = Budget::compute(1.0, 15, 300);
        TaskResult::new(RunId::new("run-1"), &spec, &budget, "emulator-5554")
    }

    #[test]
    fn test_record_completed_carries_payload() {
        let mut result = sample();
        result.record_completed(
            Some(1.0),
            AgentRunPayload {
                steps: 7,
                success: true,
                reason: "Wifi is off".to_string(),
            },
        );

        assert!(result.success);
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.agent_payload.as_ref().map(|p| p.steps), Some(7));
        assert!(result.finished_at.is_some());
    }

    #[test]
    fn test_record_timeout_is_unsuccessful_but_scored() {
        let mut result = sample();
        result.record_timeout(Some(0.5), 12, "Timeout after 300 seconds");

        assert!(!result.success);
        assert_eq!(result.score, Some(0.5));
        let payload = result.agent_payload.expect("payload");
        assert_eq!(payload.steps, 12);
        assert!(!payload.success);
        assert!(payload.reason.contains("300"));
    }

    #[test]
    fn test_record_error_has_no_score_or_payload() {
        let mut result = sample();
        result.record_error("connection refused");

        assert!(!result.success);
        assert_eq!(result.score, None);
        assert!(result.agent_payload.is_none());
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }
}
