//! The budgeted agent step loop.

use tracing::{debug, info, warn};

use droidbench_core::{AgentRunPayload, Budget};

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::tools::ToolSurface;
use crate::trajectory::Trajectory;

/// Behavioral switches forwarded to the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorFlags {
    /// Ask the model to reason before acting.
    pub reasoning: bool,
    /// Reflect on failed actions.
    pub reflection: bool,
    /// Emit per-step trace output.
    pub tracing: bool,
    /// Verbose debugging.
    pub debug: bool,
}

/// An autonomous agent bound to one task attempt.
///
/// The agent owns its budget: `run` enforces the wall-clock limit and the
/// internal step loop enforces the step and retry limits. A timed-out run
/// surfaces as [`AgentError::Timeout`] carrying the step counter, so callers
/// can record partial progress.
pub struct DeviceAgent {
    goal: String,
    budget: Budget,
    flags: BehaviorFlags,
    llm: LlmClient,
    tools: Box<dyn ToolSurface>,
    steps: u32,
    trajectory: Trajectory,
}

impl DeviceAgent {
    /// Create an agent for one goal under one budget.
    pub fn new(
        goal: impl Into<String>,
        budget: Budget,
        llm: LlmClient,
        tools: Box<dyn ToolSurface>,
    ) -> Self {
        Self {
            goal: goal.into(),
            budget,
            flags: BehaviorFlags::default(),
            llm,
            tools,
            steps: 0,
            trajectory: Trajectory::new(),
        }
    }

    /// Builder method to set behavioral flags.
    pub fn with_flags(mut self, flags: BehaviorFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Steps taken so far. Meaningful after `run` returns, including on the
    /// timeout path.
    pub fn steps_taken(&self) -> u32 {
        self.steps
    }

    /// The trajectory recorded so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Consume the agent and keep its trajectory.
    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    /// Drive the agent until completion, step-budget exhaustion, or the
    /// wall-clock limit.
    pub async fn run(&mut self) -> Result<AgentRunPayload, AgentError> {
        let timeout = self.budget.timeout;
        info!(
            goal = %self.goal,
            max_steps = self.budget.max_steps,
            timeout_secs = timeout.as_secs(),
            "starting agent run"
        );

        let outcome = tokio::time::timeout(timeout, self.drive()).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(steps = self.steps, "agent run hit its wall-clock limit");
                Err(AgentError::Timeout {
                    steps: self.steps,
                    timeout,
                })
            }
        }
    }

    async fn drive(&mut self) -> Result<AgentRunPayload, AgentError> {
        while self.steps < self.budget.max_steps {
            let observation = self.tools.observe().await?;
            let action = self.next_action_with_retry(&observation).await?;
            self.tools.apply(&action).await?;

            self.steps += 1;
            self.trajectory.push(self.steps, &observation, &action);
            if self.flags.tracing {
                debug!(step = self.steps, action = %action, "step applied");
            }

            if let Some(done) = self.tools.completion() {
                info!(steps = self.steps, success = done.success, "agent reported completion");
                return Ok(AgentRunPayload {
                    steps: self.steps,
                    success: done.success,
                    reason: done.reason.clone(),
                });
            }
        }

        Ok(AgentRunPayload {
            steps: self.steps,
            success: false,
            reason: format!("Step budget of {} exhausted", self.budget.max_steps),
        })
    }

    /// One model call, retried up to the budget's retry limit.
    async fn next_action_with_retry(&self, observation: &str) -> Result<String, AgentError> {
        let history: Vec<String> = self.trajectory.actions().map(str::to_string).collect();

        let mut last_err = None;
        for attempt in 0..=self.budget.max_retries {
            match self.llm.next_action(&self.goal, observation, &history).await {
                Ok(action) => return Ok(action),
                Err(e) => {
                    warn!(attempt, error = %e, "next-action request failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AgentError::Llm("no attempts made".to_string())))
    }
}
