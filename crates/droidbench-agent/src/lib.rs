//! Droidbench Agent Runtime
//!
//! A budgeted observe/decide/act loop over an LLM provider and a
//! device-bound tool surface. The runtime enforces the attempt's step,
//! retry, and wall-clock budgets; a timed-out run is a distinguished outcome
//! that still exposes the step counter, never an opaque failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use droidbench_agent::{AdbToolSurface, DeviceAgent, LlmClient, LlmConfig, LlmProvider};
//! use droidbench_core::Budget;
//! use droidbench_device::AdbController;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let adb = AdbController::new("adb", "emulator-5554");
//!     let llm = LlmClient::new(LlmConfig::new(LlmProvider::Gemini, "gemini-2.5-pro"))?;
//!     let budget = Budget::compute(2.0, 15, 300);
//!
//!     let mut agent = DeviceAgent::new(
//!         "Turn off wifi",
//!         budget,
//!         llm,
//!         Box::new(AdbToolSurface::new(adb)),
//!     );
//!     let payload = agent.run().await?;
//!     println!("success: {}", payload.success);
//!     Ok(())
//! }
//! ```

mod agent;
mod error;
mod llm;
mod provider;
mod tools;
mod trajectory;

pub use agent::{BehaviorFlags, DeviceAgent};
pub use error::AgentError;
pub use llm::LlmClient;
pub use provider::{LlmConfig, LlmProvider};
pub use tools::{AdbToolSurface, Completion, ToolSurface};
pub use trajectory::{Trajectory, TrajectoryStep};
