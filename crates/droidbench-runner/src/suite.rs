//! Suite orchestrator.
//!
//! Iterates the configured task list strictly one attempt at a time and
//! never stops because a single attempt aborted or failed; per-task
//! isolation is the defining property of this loop. The run ends early only
//! when the environment itself becomes unusable.

use tracing::{error, info, warn};

use droidbench_core::{RunId, Stage, TaskOutcome};

use crate::config::SuiteConfig;
use crate::error::RunnerError;
use crate::lifecycle::{Collaborators, TaskLifecycle};
use crate::notify::ExceptionContext;

/// Tallies for one finished suite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    /// Attempts started.
    pub attempted: usize,
    /// Attempts that ran their full lifecycle and produced a record.
    pub completed: usize,
    /// Attempts abandoned before the agent ran.
    pub aborted: usize,
    /// Completed attempts whose agent reported success.
    pub succeeded: usize,
}

/// Runs every instance of every configured task.
pub struct Suite {
    collaborators: Collaborators,
    config: SuiteConfig,
}

impl Suite {
    /// Create a suite run over the given collaborators.
    pub fn new(collaborators: Collaborators, config: SuiteConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Execute the whole suite.
    ///
    /// Returns `Err` only when the environment cannot be reset or the suite
    /// cannot be reinitialized; individual task failures are tallied and the
    /// loop continues.
    pub async fn run(&self) -> Result<SuiteSummary, RunnerError> {
        self.collaborators
            .env
            .reset(true)
            .await
            .map_err(RunnerError::ResetFailed)?;

        info!(
            family = %self.config.task_family,
            combinations = self.config.n_task_combinations,
            seed = self.config.seed,
            "reinitializing suite"
        );
        self.collaborators
            .env
            .reinitialize_suite(
                self.config.n_task_combinations,
                self.config.seed,
                &self.config.task_family,
            )
            .await
            .map_err(RunnerError::SuiteInitFailed)?;

        let task_list = self.resolve_task_list().await?;
        info!(count = task_list.len(), tasks = ?task_list, "resolved task list");

        let run_id = RunId::generate();
        info!(run_id = %run_id, device = %self.config.device_serial, "starting suite run");
        let lifecycle = TaskLifecycle::new(run_id, self.collaborators.clone(), &self.config);

        let mut summary = SuiteSummary::default();
        for task_name in &task_list {
            let count = match self.collaborators.env.task_instance_count(task_name).await {
                Ok(count) => count,
                Err(e) => {
                    error!(task = %task_name, error = %e, "could not query instance count; skipping task");
                    self.collaborators
                        .channel
                        .notify(
                            &e.to_string(),
                            ExceptionContext {
                                stage: Stage::Prepare,
                                task_name,
                                task_idx: 0,
                                goal: "",
                                device_serial: &self.config.device_serial,
                            },
                        )
                        .await;
                    continue;
                }
            };

            for task_idx in 0..count {
                info!(task = %task_name, task_idx, "running task");
                summary.attempted += 1;

                match lifecycle.run(task_name, task_idx).await? {
                    TaskOutcome::Completed(result) => {
                        summary.completed += 1;
                        if result.success {
                            summary.succeeded += 1;
                        }
                        if let Err(e) = self.collaborators.sink.persist(&result).await {
                            warn!(task = %task_name, task_idx, error = %e, "could not persist task result");
                        }
                    }
                    TaskOutcome::Aborted { stage, detail } => {
                        summary.aborted += 1;
                        info!(
                            task = %task_name,
                            task_idx,
                            stage = %stage,
                            detail = %detail,
                            "task aborted; continuing to next task"
                        );
                    }
                }
            }
        }

        info!(
            attempted = summary.attempted,
            completed = summary.completed,
            aborted = summary.aborted,
            succeeded = summary.succeeded,
            "suite finished"
        );
        Ok(summary)
    }

    /// Either the caller's explicit task names intersected with the
    /// environment's known list (caller order preserved), or the
    /// environment's list over the configured index range.
    async fn resolve_task_list(&self) -> Result<Vec<String>, RunnerError> {
        if self.config.tasks.is_empty() {
            return self
                .collaborators
                .env
                .list_tasks(Some(self.config.min_task_idx), self.config.max_task_idx)
                .await
                .map_err(RunnerError::SuiteInitFailed);
        }

        let known = self
            .collaborators
            .env
            .list_tasks(None, None)
            .await
            .map_err(RunnerError::SuiteInitFailed)?;

        let selected: Vec<String> = self
            .config
            .tasks
            .iter()
            .filter(|name| known.contains(*name))
            .cloned()
            .collect();
        if selected.len() < self.config.tasks.len() {
            warn!(
                requested = self.config.tasks.len(),
                matched = selected.len(),
                "some requested tasks are unknown to the environment"
            );
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCapability, FakeEnv, FakeLauncher, FakeOverlay, RecordingChannel, RecordingSink};
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        env: Arc<FakeEnv>,
        channel: Arc<RecordingChannel>,
        sink: Arc<RecordingSink>,
        suite: Suite,
    }

    fn harness(env: FakeEnv, config: SuiteConfig) -> Harness {
        let env = Arc::new(env);
        let channel = Arc::new(RecordingChannel::default());
        let sink = Arc::new(RecordingSink::default());

        let collaborators = Collaborators {
            env: env.clone(),
            capability: Arc::new(FakeCapability::default()),
            overlay: Arc::new(FakeOverlay::default()),
            launcher: Arc::new(FakeLauncher::default()),
            channel: channel.clone(),
            sink: sink.clone(),
        };
        let suite = Suite::new(collaborators, config);

        Harness {
            env,
            channel,
            sink,
            suite,
        }
    }

    fn quick_config() -> SuiteConfig {
        SuiteConfig {
            keepalive_interval: Duration::from_millis(20),
            ..SuiteConfig::default()
        }
    }

    #[tokio::test]
    async fn test_abort_does_not_stop_the_suite() {
        let mut env = FakeEnv::new(&[("A", 2), ("B", 1)], 1.0);
        env.fail_initialize.push(("A".to_string(), 0));
        let h = harness(env, quick_config());

        let summary = h.suite.run().await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.completed, 2);

        let calls = h.env.calls();
        assert!(calls.contains(&"initialize A 1".to_string()));
        assert!(calls.contains(&"initialize B 0".to_string()));
        assert!(!calls.contains(&"initialize A 0".to_string()));

        // The aborted instance has no record; the other two were persisted.
        let persisted: Vec<(String, usize)> = h
            .sink
            .results()
            .iter()
            .map(|r| (r.task_name.clone(), r.task_index))
            .collect();
        assert_eq!(persisted, vec![("A".to_string(), 1), ("B".to_string(), 0)]);

        assert_eq!(h.channel.notifications().len(), 1);
        assert_eq!(h.channel.notifications()[0].stage, "initialize");
    }

    #[tokio::test]
    async fn test_explicit_tasks_are_intersected_in_caller_order() {
        let env = FakeEnv::new(&[("A", 1), ("B", 1)], 1.0);
        let config = SuiteConfig {
            tasks: vec!["B".to_string(), "C".to_string(), "A".to_string()],
            ..quick_config()
        };
        let h = harness(env, config);

        let summary = h.suite.run().await.unwrap();

        assert_eq!(summary.attempted, 2);
        let calls = h.env.calls();
        let b = calls.iter().position(|c| c == "initialize B 0").unwrap();
        let a = calls.iter().position(|c| c == "initialize A 0").unwrap();
        assert!(b < a, "caller order must be preserved");
    }

    #[tokio::test]
    async fn test_index_range_limits_the_list() {
        let env = FakeEnv::new(&[("A", 1), ("B", 1), ("C", 1)], 1.0);
        let config = SuiteConfig {
            min_task_idx: 1,
            max_task_idx: Some(2),
            ..quick_config()
        };
        let h = harness(env, config);

        let summary = h.suite.run().await.unwrap();

        assert_eq!(summary.attempted, 1);
        assert!(h.env.calls().contains(&"initialize B 0".to_string()));
    }

    #[tokio::test]
    async fn test_reset_failure_is_fatal() {
        let mut env = FakeEnv::new(&[("A", 1)], 1.0);
        env.fail_reset = true;
        let h = harness(env, quick_config());

        let err = h.suite.run().await.unwrap_err();
        assert!(matches!(err, RunnerError::ResetFailed(_)));
    }

    #[tokio::test]
    async fn test_every_instance_of_a_task_runs() {
        let env = FakeEnv::new(&[("A", 3)], 1.0);
        let h = harness(env, quick_config());

        let summary = h.suite.run().await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.succeeded, 3);
    }
}
