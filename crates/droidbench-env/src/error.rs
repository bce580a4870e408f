//! Environment client errors.

use thiserror::Error;

/// Errors returned by the environment API client.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The environment answered with a non-success status.
    #[error("environment returned HTTP {status} for {path}")]
    Api {
        status: u16,
        path: String,
    },

    /// The environment did not become healthy within the allowed time.
    #[error("environment at {base_url} not ready after {waited_secs} seconds")]
    BootTimeout {
        base_url: String,
        waited_secs: u64,
    },
}
