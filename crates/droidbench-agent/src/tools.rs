//! Tool surface the agent acts through.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use droidbench_device::AdbController;

use crate::error::AgentError;

/// Terminal state the agent can put the tool surface into.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Whether the agent believes the goal was accomplished.
    pub success: bool,
    /// The agent's stated reason.
    pub reason: String,
}

/// Device-bound action surface for one task attempt.
///
/// `observe` reports the current UI state, `apply` executes one action, and
/// `completion` becomes `Some` once the agent has declared the task finished.
#[async_trait]
pub trait ToolSurface: Send + Sync {
    /// Describe the current UI state.
    async fn observe(&mut self) -> Result<String, AgentError>;

    /// Execute one model-produced action.
    async fn apply(&mut self, action: &str) -> Result<(), AgentError>;

    /// The declared terminal state, if any.
    fn completion(&self) -> Option<&Completion>;
}

/// Action vocabulary the model is prompted to produce.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Tap { x: i32, y: i32 },
    Swipe { x1: i32, y1: i32, x2: i32, y2: i32 },
    InputText { text: String },
    Key { keycode: i32 },
    Complete { success: bool, reason: String },
}

/// Tool surface that executes actions on a device through adb and reads the
/// UI state from the portal's content provider.
pub struct AdbToolSurface {
    adb: AdbController,
    completion: Option<Completion>,
}

impl AdbToolSurface {
    /// Bind a tool surface to one device.
    pub fn new(adb: AdbController) -> Self {
        Self {
            adb,
            completion: None,
        }
    }
}

#[async_trait]
impl ToolSurface for AdbToolSurface {
    async fn observe(&mut self) -> Result<String, AgentError> {
        let state = self
            .adb
            .shell(&[
                "content",
                "query",
                "--uri",
                "content://com.droidrun.portal/a11y_tree",
            ])
            .await?;
        Ok(state)
    }

    async fn apply(&mut self, action: &str) -> Result<(), AgentError> {
        let parsed: Action = serde_json::from_str(action_json(action))
            .map_err(|e| AgentError::Action(format!("{e}: {action}")))?;
        debug!(?parsed, "applying action");

        match parsed {
            Action::Tap { x, y } => {
                self.adb
                    .shell(&["input", "tap", &x.to_string(), &y.to_string()])
                    .await?;
            }
            Action::Swipe { x1, y1, x2, y2 } => {
                self.adb
                    .shell(&[
                        "input",
                        "swipe",
                        &x1.to_string(),
                        &y1.to_string(),
                        &x2.to_string(),
                        &y2.to_string(),
                    ])
                    .await?;
            }
            Action::InputText { text } => {
                self.adb.shell(&["input", "text", &text]).await?;
            }
            Action::Key { keycode } => {
                self.adb
                    .shell(&["input", "keyevent", &keycode.to_string()])
                    .await?;
            }
            Action::Complete { success, reason } => {
                info!(success, reason = %reason, "agent declared completion");
                self.completion = Some(Completion { success, reason });
            }
        }

        Ok(())
    }

    fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }
}

/// Models occasionally wrap the action in a markdown fence; strip it before
/// parsing.
fn action_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_json_strips_fences() {
        assert_eq!(
            action_json("```json\n{\"action\":\"tap\",\"x\":1,\"y\":2}\n```"),
            "{\"action\":\"tap\",\"x\":1,\"y\":2}"
        );
        assert_eq!(action_json("{\"action\":\"key\",\"keycode\":4}"), "{\"action\":\"key\",\"keycode\":4}");
    }

    #[test]
    fn test_action_parses_complete() {
        let action: Action =
            serde_json::from_str("{\"action\":\"complete\",\"success\":true,\"reason\":\"done\"}")
                .unwrap();
        assert!(matches!(action, Action::Complete { success: true, .. }));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let parsed: Result<Action, _> = serde_json::from_str("{\"action\":\"fly\"}");
        assert!(parsed.is_err());
    }
}
