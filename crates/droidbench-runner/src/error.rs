//! Runner errors.
//!
//! Only failures that make the whole suite run unusable surface here; every
//! lesser failure is absorbed at its stage boundary and expressed through
//! task outcomes.

use droidbench_env::EnvError;
use thiserror::Error;

/// Fatal suite-run errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The environment could not be reset; it is presumed unusable.
    #[error("environment reset failed: {0}")]
    ResetFailed(#[source] EnvError),

    /// The task suite could not be (re-)initialized.
    #[error("suite reinitialization failed: {0}")]
    SuiteInitFailed(#[source] EnvError),
}
