//! HTTP client for the environment REST endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::EnvError;
use crate::Environment;

/// How often `wait_ready` polls the health endpoint.
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// HTTP client for the Android benchmark environment.
pub struct EnvClient {
    inner: reqwest::Client,
    base_url: String,
}

impl EnvClient {
    /// Create a new client for the environment at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Block until the environment reports healthy, polling every couple of
    /// seconds, up to `timeout`.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), EnvError> {
        let started = Instant::now();
        while started.elapsed() < timeout {
            match self.health().await {
                Ok(true) => {
                    debug!(base_url = %self.base_url, "environment is healthy");
                    return Ok(());
                }
                Ok(false) => debug!(base_url = %self.base_url, "environment not healthy yet"),
                Err(e) => debug!(error = %e, "health check failed"),
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }

        Err(EnvError::BootTimeout {
            base_url: self.base_url.clone(),
            waited_secs: timeout.as_secs(),
        })
    }

    /// Get JSON from an endpoint.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, EnvError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(EnvError::Api {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// Post JSON to an endpoint, discarding the response body.
    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), EnvError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST request");

        let response = self.inner.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            return Err(EnvError::Api {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        Ok(())
    }

    fn task_query(task_name: &str, task_idx: usize) -> Vec<(&'static str, String)> {
        vec![
            ("task_name", task_name.to_string()),
            ("task_idx", task_idx.to_string()),
        ]
    }
}

#[async_trait]
impl Environment for EnvClient {
    async fn health(&self) -> Result<bool, EnvError> {
        let url = format!("{}/health", self.base_url);
        match self.inner.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!(error = %e, "health request failed");
                Ok(false)
            }
        }
    }

    async fn reset(&self, go_home: bool) -> Result<(), EnvError> {
        self.post_json("/reset", &json!({ "go_home": go_home })).await
    }

    async fn reinitialize_suite(
        &self,
        n_task_combinations: u32,
        seed: u64,
        task_family: &str,
    ) -> Result<(), EnvError> {
        self.post_json(
            "/reinitialize_suite",
            &json!({
                "n_task_combinations": n_task_combinations,
                "seed": seed,
                "task_family": task_family,
            }),
        )
        .await
    }

    async fn list_tasks(
        &self,
        min_idx: Option<usize>,
        max_idx: Option<usize>,
    ) -> Result<Vec<String>, EnvError> {
        let mut query = Vec::new();
        if let Some(min) = min_idx {
            query.push(("min_task_idx", min.to_string()));
        }
        if let Some(max) = max_idx {
            query.push(("max_task_idx", max.to_string()));
        }
        self.get_json("/task_list", &query).await
    }

    async fn task_instance_count(&self, task_name: &str) -> Result<usize, EnvError> {
        let query = vec![("task_name", task_name.to_string())];
        self.get_json("/task_length", &query).await
    }

    async fn task_goal(&self, task_name: &str, task_idx: usize) -> Result<String, EnvError> {
        self.get_json("/task_goal", &Self::task_query(task_name, task_idx))
            .await
    }

    async fn task_complexity(&self, task_name: &str, task_idx: usize) -> Result<f64, EnvError> {
        self.get_json("/task_complexity", &Self::task_query(task_name, task_idx))
            .await
    }

    async fn initialize_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError> {
        self.post_json(
            "/initialize_task",
            &json!({ "task_name": task_name, "task_idx": task_idx }),
        )
        .await
    }

    async fn task_score(&self, task_name: &str, task_idx: usize) -> Result<f64, EnvError> {
        self.get_json("/task_score", &Self::task_query(task_name, task_idx))
            .await
    }

    async fn tear_down_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError> {
        self.post_json(
            "/tear_down_task",
            &json!({ "task_name": task_name, "task_idx": task_idx }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = EnvClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_task_query_fields() {
        let query = EnvClient::task_query("SystemWifiTurnOff", 3);
        assert_eq!(
            query,
            vec![
                ("task_name", "SystemWifiTurnOff".to_string()),
                ("task_idx", "3".to_string()),
            ]
        );
    }
}
