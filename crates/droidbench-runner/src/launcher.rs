//! Agent launch seam.
//!
//! The lifecycle controller needs a fresh agent per attempt but must stay
//! testable without a device or an LLM, so agent construction sits behind a
//! trait.

use async_trait::async_trait;

use droidbench_agent::{
    AdbToolSurface, AgentError, BehaviorFlags, DeviceAgent, LlmClient, LlmConfig, Trajectory,
};
use droidbench_core::{AgentRunPayload, Budget, TaskSpec};
use droidbench_device::AdbController;

/// Everything one agent run left behind: its outcome and its trajectory.
/// The trajectory is persisted whatever the outcome was.
pub struct AgentAttempt {
    pub outcome: Result<AgentRunPayload, AgentError>,
    pub trajectory: Trajectory,
}

/// Constructs and drives one agent per task attempt.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Run an agent against the given task under the given budget.
    async fn run_task(&self, spec: &TaskSpec, budget: &Budget) -> AgentAttempt;
}

/// Production launcher: a [`DeviceAgent`] over an adb tool surface.
pub struct DeviceAgentLauncher {
    adb: AdbController,
    llm: LlmConfig,
    flags: BehaviorFlags,
}

impl DeviceAgentLauncher {
    /// Create a launcher bound to one device and one LLM configuration.
    pub fn new(adb: AdbController, llm: LlmConfig, flags: BehaviorFlags) -> Self {
        Self { adb, llm, flags }
    }
}

#[async_trait]
impl AgentLauncher for DeviceAgentLauncher {
    async fn run_task(&self, spec: &TaskSpec, budget: &Budget) -> AgentAttempt {
        let llm = match LlmClient::new(self.llm.clone()) {
            Ok(llm) => llm,
            Err(e) => {
                return AgentAttempt {
                    outcome: Err(e),
                    trajectory: Trajectory::new(),
                }
            }
        };

        let tools = Box::new(AdbToolSurface::new(self.adb.clone()));
        let mut agent = DeviceAgent::new(&spec.goal, *budget, llm, tools).with_flags(self.flags);

        let outcome = agent.run().await;
        AgentAttempt {
            outcome,
            trajectory: agent.into_trajectory(),
        }
    }
}
