//! Fire-and-forget exception notifications.
//!
//! Stage failures that don't stop the suite still need a human to hear about
//! them. The channel is strictly fire-and-forget: `notify` never returns an
//! error and never panics, so orchestrator control flow cannot depend on
//! notification delivery.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use droidbench_core::Stage;

/// Context describing where an exception occurred.
#[derive(Debug, Clone)]
pub struct ExceptionContext<'a> {
    pub stage: Stage,
    pub task_name: &'a str,
    pub task_idx: usize,
    pub goal: &'a str,
    pub device_serial: &'a str,
}

/// Outbound channel for non-fatal failures.
#[async_trait]
pub trait ExceptionChannel: Send + Sync {
    /// Report one failure. Must never raise; delivery problems are the
    /// channel's own concern.
    async fn notify(&self, error: &str, ctx: ExceptionContext<'_>);
}

/// Channel that drops every notification. Used when no webhook is
/// configured.
pub struct NoopChannel;

#[async_trait]
impl ExceptionChannel for NoopChannel {
    async fn notify(&self, error: &str, ctx: ExceptionContext<'_>) {
        debug!(stage = %ctx.stage, task = %ctx.task_name, error = %error, "notification dropped (no channel configured)");
    }
}

/// Discord webhook channel.
pub struct DiscordChannel {
    http: reqwest::Client,
    webhook_url: String,
}

impl DiscordChannel {
    /// Create a channel posting to the given webhook URL.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl ExceptionChannel for DiscordChannel {
    async fn notify(&self, error: &str, ctx: ExceptionContext<'_>) {
        let body = webhook_payload(error, &ctx);

        match self.http.post(&self.webhook_url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(stage = %ctx.stage, task = %ctx.task_name, "exception notification sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "exception notification rejected");
            }
            Err(e) => {
                warn!(error = %e, "could not deliver exception notification");
            }
        }
    }
}

fn webhook_payload(error: &str, ctx: &ExceptionContext<'_>) -> serde_json::Value {
    json!({
        "embeds": [{
            "title": format!("Benchmark exception: {}", ctx.stage),
            "description": error,
            "fields": [
                { "name": "Task", "value": format!("{} {}", ctx.task_name, ctx.task_idx), "inline": true },
                { "name": "Device", "value": ctx.device_serial, "inline": true },
                { "name": "Goal", "value": ctx.goal, "inline": false },
            ],
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExceptionContext<'static> {
        ExceptionContext {
            stage: Stage::Initialize,
            task_name: "SystemWifiTurnOff",
            task_idx: 1,
            goal: "Turn off wifi",
            device_serial: "emulator-5554",
        }
    }

    #[test]
    fn test_payload_carries_stage_and_task() {
        let payload = webhook_payload("connection refused", &ctx());
        let embed = &payload["embeds"][0];

        assert_eq!(embed["title"], "Benchmark exception: initialize");
        assert_eq!(embed["description"], "connection refused");
        assert_eq!(embed["fields"][0]["value"], "SystemWifiTurnOff 1");
        assert_eq!(embed["fields"][1]["value"], "emulator-5554");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_raise() {
        let channel = DiscordChannel::new("http://127.0.0.1:9/hooks/nothing");
        channel.notify("boom", ctx()).await;
    }
}
