//! Droidbench Environment Client
//!
//! HTTP client for the Android benchmark environment API: suite management,
//! task instantiation, goals, complexities, scores, and teardown. The
//! orchestrator consumes the [`Environment`] trait so tests can substitute
//! an in-memory fake for the live HTTP client.

mod client;
mod error;

use async_trait::async_trait;

pub use client::EnvClient;
pub use error::EnvError;

/// Operations the benchmark environment exposes.
///
/// All calls may fail with a generic [`EnvError`]; none return partial or
/// ambiguous states.
#[async_trait]
pub trait Environment: Send + Sync {
    /// True when the environment is up and ready to serve requests.
    async fn health(&self) -> Result<bool, EnvError>;

    /// Full environment reset, optionally returning the device to the home
    /// screen.
    async fn reset(&self, go_home: bool) -> Result<(), EnvError>;

    /// Rebuild the task suite with the given parameterization.
    async fn reinitialize_suite(
        &self,
        n_task_combinations: u32,
        seed: u64,
        task_family: &str,
    ) -> Result<(), EnvError>;

    /// List task template names, optionally restricted to an index range.
    async fn list_tasks(
        &self,
        min_idx: Option<usize>,
        max_idx: Option<usize>,
    ) -> Result<Vec<String>, EnvError>;

    /// Number of parameterized instances of the named task template.
    async fn task_instance_count(&self, task_name: &str) -> Result<usize, EnvError>;

    /// Natural-language goal of one task instance.
    async fn task_goal(&self, task_name: &str, task_idx: usize) -> Result<String, EnvError>;

    /// Complexity rating of one task instance. Positive for every defined
    /// instance.
    async fn task_complexity(&self, task_name: &str, task_idx: usize) -> Result<f64, EnvError>;

    /// Instantiate the task variant on the device.
    async fn initialize_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError>;

    /// Numeric score for the (possibly partial) progress on one instance.
    async fn task_score(&self, task_name: &str, task_idx: usize) -> Result<f64, EnvError>;

    /// Tear the task instance down.
    async fn tear_down_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError>;
}
