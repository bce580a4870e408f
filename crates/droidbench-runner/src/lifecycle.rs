//! Per-task lifecycle controller.
//!
//! One controller drives every attempt of a suite run through the same
//! stages: reset, prepare, initialize, enable capability, run the agent,
//! score, persist the trajectory, tear down. Each stage failure is absorbed
//! according to its class — only a failed environment reset escapes as an
//! error, because the environment is then presumed unusable for every
//! subsequent task as well.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use droidbench_agent::AgentError;
use droidbench_core::{Budget, RunId, Stage, TaskOutcome, TaskResult, TaskSpec};
use droidbench_device::{CapabilityControl, OverlayToggle};
use droidbench_env::Environment;

use crate::config::SuiteConfig;
use crate::error::RunnerError;
use crate::keepalive::OverlayKeepalive;
use crate::launcher::AgentLauncher;
use crate::notify::{ExceptionChannel, ExceptionContext};
use crate::results::ResultSink;

/// External collaborators of the lifecycle controller and suite.
#[derive(Clone)]
pub struct Collaborators {
    pub env: Arc<dyn Environment>,
    pub capability: Arc<dyn CapabilityControl>,
    pub overlay: Arc<dyn OverlayToggle>,
    pub launcher: Arc<dyn AgentLauncher>,
    pub channel: Arc<dyn ExceptionChannel>,
    pub sink: Arc<dyn ResultSink>,
}

/// Drives single task attempts through their lifecycle.
pub struct TaskLifecycle {
    run_id: RunId,
    env: Arc<dyn Environment>,
    capability: Arc<dyn CapabilityControl>,
    launcher: Arc<dyn AgentLauncher>,
    channel: Arc<dyn ExceptionChannel>,
    sink: Arc<dyn ResultSink>,
    keepalive: OverlayKeepalive,
    device_serial: String,
    max_steps_multiplier: u32,
    timeout_multiplier: u32,
}

impl TaskLifecycle {
    /// Create a controller for one suite run.
    pub fn new(run_id: RunId, collaborators: Collaborators, config: &SuiteConfig) -> Self {
        let keepalive = OverlayKeepalive::new(collaborators.overlay)
            .with_interval(config.keepalive_interval);

        Self {
            run_id,
            env: collaborators.env,
            capability: collaborators.capability,
            launcher: collaborators.launcher,
            channel: collaborators.channel,
            sink: collaborators.sink,
            keepalive,
            device_serial: config.device_serial.clone(),
            max_steps_multiplier: config.max_steps_multiplier,
            timeout_multiplier: config.timeout_multiplier,
        }
    }

    /// Execute one task attempt.
    ///
    /// Returns `Err` only when the environment reset fails; every other
    /// failure is reflected in the returned [`TaskOutcome`]. For each
    /// attempt the keepalive is started at most once and stopped exactly
    /// once after starting, whatever stage failed.
    pub async fn run(&self, task_name: &str, task_idx: usize) -> Result<TaskOutcome, RunnerError> {
        self.env.reset(true).await.map_err(RunnerError::ResetFailed)?;

        let goal = match self.env.task_goal(task_name, task_idx).await {
            Ok(goal) => goal,
            Err(e) => return Ok(self.abort(Stage::Prepare, task_name, task_idx, "", &e).await),
        };
        let complexity = match self.env.task_complexity(task_name, task_idx).await {
            Ok(complexity) => complexity,
            Err(e) => return Ok(self.abort(Stage::Prepare, task_name, task_idx, &goal, &e).await),
        };

        let spec = TaskSpec::new(task_name, task_idx, goal, complexity);
        let budget = Budget::compute(complexity, self.max_steps_multiplier, self.timeout_multiplier);
        info!(
            task = %spec,
            complexity,
            max_steps = budget.max_steps,
            max_retries = budget.max_retries,
            timeout_secs = budget.timeout_secs(),
            goal = %spec.goal,
            "initializing task"
        );

        if let Err(e) = self.env.initialize_task(&spec.name, spec.index).await {
            return Ok(self
                .abort(Stage::Initialize, &spec.name, spec.index, &spec.goal, &e)
                .await);
        }
        debug!("task initialized");

        if let Err(e) = self.capability.enable_capability(true).await {
            // Stop is a no-op when the keepalive never started for this
            // attempt, and pairs a leaked start from a crashed prior stage.
            self.keepalive.stop().await;
            return Ok(self
                .abort(Stage::EnableCapability, &spec.name, spec.index, &spec.goal, &e)
                .await);
        }
        debug!("accessibility capability enabled");

        self.keepalive.start();
        let mut result = TaskResult::new(self.run_id.clone(), &spec, &budget, &self.device_serial);

        info!(task = %spec, "running agent");
        let attempt = self.launcher.run_task(&spec, &budget).await;
        match attempt.outcome {
            Ok(payload) => {
                debug!(task = %spec, steps = payload.steps, "agent completed");
                let score = self.fetch_score(&spec).await;
                result.record_completed(score, payload);
            }
            Err(AgentError::Timeout { steps, .. }) => {
                warn!(task = %spec, steps, "agent timed out");
                let score = self.fetch_score(&spec).await;
                result.record_timeout(
                    score,
                    steps,
                    format!("Timeout after {} seconds", budget.timeout_secs()),
                );
            }
            Err(e) => {
                error!(task = %spec, error = %e, "agent run failed");
                result.record_error(e.to_string());
            }
        }
        if let Some(score) = result.score {
            info!(task = %spec, score, "task scored");
        }

        // The trajectory is persisted whatever the run outcome was, and a
        // persistence failure never invalidates the result produced above.
        if let Err(e) = self
            .sink
            .persist_trajectory(&spec.name, spec.index, &attempt.trajectory)
            .await
        {
            warn!(task = %spec, error = %e, "could not persist trajectory");
            self.channel
                .notify(&e.to_string(), self.ctx(Stage::Persist, &spec))
                .await;
        }

        // The keepalive stops exactly once on both teardown branches.
        match self.env.tear_down_task(&spec.name, spec.index).await {
            Ok(()) => {
                debug!(task = %spec, "task torn down");
                self.keepalive.stop().await;
            }
            Err(e) => {
                error!(task = %spec, error = %e, "task teardown failed");
                self.keepalive.stop().await;
                self.channel
                    .notify(&e.to_string(), self.ctx(Stage::TearDown, &spec))
                    .await;
            }
        }

        Ok(TaskOutcome::Completed(result))
    }

    /// Fetch the task score, degrading to `None` on failure.
    async fn fetch_score(&self, spec: &TaskSpec) -> Option<f64> {
        match self.env.task_score(&spec.name, spec.index).await {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(task = %spec, error = %e, "could not fetch task score");
                self.channel
                    .notify(&e.to_string(), self.ctx(Stage::Score, spec))
                    .await;
                None
            }
        }
    }

    async fn abort(
        &self,
        stage: Stage,
        task_name: &str,
        task_idx: usize,
        goal: &str,
        cause: &impl Display,
    ) -> TaskOutcome {
        error!(task = %task_name, task_idx, stage = %stage, error = %cause, "abandoning task attempt");
        self.channel
            .notify(
                &cause.to_string(),
                ExceptionContext {
                    stage,
                    task_name,
                    task_idx,
                    goal,
                    device_serial: &self.device_serial,
                },
            )
            .await;

        TaskOutcome::Aborted {
            stage,
            detail: cause.to_string(),
        }
    }

    fn ctx<'a>(&'a self, stage: Stage, spec: &'a TaskSpec) -> ExceptionContext<'a> {
        ExceptionContext {
            stage,
            task_name: &spec.name,
            task_idx: spec.index,
            goal: &spec.goal,
            device_serial: &self.device_serial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCapability, FakeEnv, FakeLauncher, FakeOverlay, RecordingChannel, RecordingSink};
    use std::time::Duration;

    struct Harness {
        env: Arc<FakeEnv>,
        capability: Arc<FakeCapability>,
        overlay: Arc<FakeOverlay>,
        launcher: Arc<FakeLauncher>,
        channel: Arc<RecordingChannel>,
        sink: Arc<RecordingSink>,
        lifecycle: TaskLifecycle,
    }

    fn harness(env: FakeEnv, launcher: FakeLauncher) -> Harness {
        let env = Arc::new(env);
        let capability = Arc::new(FakeCapability::default());
        let overlay = Arc::new(FakeOverlay::default());
        let launcher = Arc::new(launcher);
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(RecordingSink::default());

        let collaborators = Collaborators {
            env: env.clone(),
            capability: capability.clone(),
            overlay: overlay.clone(),
            launcher: launcher.clone(),
            channel: channel.clone(),
            sink: sink.clone(),
        };
        let config = SuiteConfig {
            keepalive_interval: Duration::from_millis(20),
            ..SuiteConfig::default()
        };
        let lifecycle = TaskLifecycle::new(RunId::new("run-test"), collaborators, &config);

        Harness {
            env,
            capability,
            overlay,
            launcher,
            channel,
            sink,
            lifecycle,
        }
    }

    fn env_with_one_task() -> FakeEnv {
        FakeEnv::new(&[("A", 1)], 2.0)
    }

    #[tokio::test]
    async fn test_success_path_scores_and_tears_down() {
        let h = harness(env_with_one_task(), FakeLauncher::default());

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        let result = outcome.result().expect("completed");
        assert!(result.success);
        assert_eq!(result.score, Some(0.5));
        assert_eq!(result.max_steps, 30);

        let calls = h.env.calls();
        assert!(calls.contains(&"score A 0".to_string()));
        assert!(calls.contains(&"tear_down A 0".to_string()));
        assert_eq!(h.sink.trajectories(), vec![("A".to_string(), 0)]);
        assert!(!h.lifecycle.keepalive.is_running());
        assert!(h.overlay.count() >= 1);
        assert!(h.channel.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_reset_failure_is_fatal() {
        let mut env = env_with_one_task();
        env.fail_reset = true;
        let h = harness(env, FakeLauncher::default());

        let err = h.lifecycle.run("A", 0).await.unwrap_err();
        assert!(matches!(err, RunnerError::ResetFailed(_)));
        assert!(h.channel.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_failure_aborts_with_one_notification() {
        let mut env = env_with_one_task();
        env.fail_initialize.push(("A".to_string(), 0));
        let h = harness(env, FakeLauncher::default());

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        assert!(matches!(
            outcome,
            TaskOutcome::Aborted { stage: Stage::Initialize, .. }
        ));
        let notifications = h.channel.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].stage, "initialize");
        assert_eq!(notifications[0].task, ("A".to_string(), 0));

        // The agent never ran, nothing was persisted, nothing was scored.
        assert_eq!(h.launcher.launches(), 0);
        assert_eq!(h.capability.calls(), 0);
        assert!(h.sink.results().is_empty());
        assert!(h.sink.trajectories().is_empty());
        assert!(!h.env.calls().iter().any(|c| c.starts_with("score")));
    }

    #[tokio::test]
    async fn test_capability_failure_aborts_and_keepalive_is_down() {
        let env = env_with_one_task();
        let h = harness(env, FakeLauncher::default());
        h.capability.fail();

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        assert!(matches!(
            outcome,
            TaskOutcome::Aborted { stage: Stage::EnableCapability, .. }
        ));
        assert_eq!(h.channel.notifications()[0].stage, "enable_capability");
        assert_eq!(h.launcher.launches(), 0);
        assert!(!h.lifecycle.keepalive.is_running());
    }

    #[tokio::test]
    async fn test_timeout_still_scores_and_reason_names_the_budget() {
        let env = env_with_one_task();
        // complexity 2.0 * 300 = 600 second budget
        let launcher = FakeLauncher::timing_out(12);
        let h = harness(env, launcher);

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        let result = outcome.result().expect("completed");
        assert!(!result.success);
        assert_eq!(result.score, Some(0.5));
        assert!(result.reason.as_deref().unwrap().contains("600"));
        let payload = result.agent_payload.as_ref().expect("payload");
        assert_eq!(payload.steps, 12);
        assert!(h.env.calls().contains(&"score A 0".to_string()));
        assert!(!h.lifecycle.keepalive.is_running());
    }

    #[tokio::test]
    async fn test_generic_agent_error_skips_scoring() {
        let env = env_with_one_task();
        let h = harness(env, FakeLauncher::erroring("model exploded"));

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        let result = outcome.result().expect("completed");
        assert!(!result.success);
        assert_eq!(result.score, None);
        assert!(result.error.as_deref().unwrap().contains("model exploded"));
        assert!(!h.env.calls().iter().any(|c| c.starts_with("score")));
        // The trajectory is still persisted on the error path.
        assert_eq!(h.sink.trajectories().len(), 1);
    }

    #[tokio::test]
    async fn test_score_failure_is_soft() {
        let mut env = env_with_one_task();
        env.fail_score = true;
        let h = harness(env, FakeLauncher::default());

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        let result = outcome.result().expect("completed");
        assert_eq!(result.score, None);
        assert!(result.success);
        assert_eq!(h.channel.notifications()[0].stage, "score");
    }

    #[tokio::test]
    async fn test_trajectory_persist_failure_keeps_result() {
        let env = env_with_one_task();
        let h = harness(env, FakeLauncher::default());
        h.sink.fail_trajectory();

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        assert!(outcome.result().is_some());
        assert_eq!(h.channel.notifications()[0].stage, "persist_trajectory");
        assert!(h.env.calls().contains(&"tear_down A 0".to_string()));
    }

    #[tokio::test]
    async fn test_teardown_failure_keeps_result_and_stops_keepalive() {
        let mut env = env_with_one_task();
        env.fail_teardown = true;
        let h = harness(env, FakeLauncher::default());

        let outcome = h.lifecycle.run("A", 0).await.unwrap();

        assert!(outcome.result().is_some());
        assert_eq!(h.channel.notifications()[0].stage, "tear_down");
        assert!(!h.lifecycle.keepalive.is_running());
    }
}
