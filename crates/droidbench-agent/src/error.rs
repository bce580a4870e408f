//! Agent runtime errors.

use std::time::Duration;

use droidbench_device::DeviceError;
use thiserror::Error;

/// Errors that can occur while running the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The run exceeded its wall-clock budget. Carries the step counter so
    /// callers can still record how far the agent got.
    #[error("agent timed out after {} seconds ({steps} steps taken)", .timeout.as_secs())]
    Timeout { steps: u32, timeout: Duration },

    /// Provider API key environment variable is not set.
    #[error("LLM API key missing: set {0}")]
    MissingApiKey(&'static str),

    /// Transport-level failure talking to the LLM provider.
    #[error("LLM HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered but the response was unusable.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Device command failure underneath the tool surface.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The model produced an action the tool surface cannot execute.
    #[error("unusable action: {0}")]
    Action(String),
}
