//! Thin HTTP client for next-action completions.

use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::error::AgentError;
use crate::provider::{LlmConfig, LlmProvider};

const SYSTEM_PROMPT: &str = "You are an Android device automation agent. \
Given a goal, the current UI state, and the actions taken so far, respond \
with exactly one JSON action object and nothing else. Supported actions: \
{\"action\":\"tap\",\"x\":<int>,\"y\":<int>}, \
{\"action\":\"swipe\",\"x1\":<int>,\"y1\":<int>,\"x2\":<int>,\"y2\":<int>}, \
{\"action\":\"input_text\",\"text\":<string>}, \
{\"action\":\"key\",\"keycode\":<int>}, \
{\"action\":\"complete\",\"success\":<bool>,\"reason\":<string>}.";

/// Client for one provider/model pair.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl LlmClient {
    /// Create a client, reading the API key from the provider's environment
    /// variable.
    pub fn new(config: LlmConfig) -> Result<Self, AgentError> {
        let env = config.provider.api_key_env();
        let api_key =
            std::env::var(env).map_err(|_| AgentError::MissingApiKey(env))?;

        Ok(Self {
            http: reqwest::Client::new(),
            config,
            api_key,
        })
    }

    /// Ask the model for the next action given the goal, the current UI
    /// observation, and the actions taken so far.
    pub async fn next_action(
        &self,
        goal: &str,
        observation: &str,
        history: &[String],
    ) -> Result<String, AgentError> {
        let prompt = build_prompt(goal, observation, history);
        debug!(provider = %self.config.provider, model = %self.config.model, "requesting next action");

        let text = match self.config.provider {
            LlmProvider::OpenAi => self.complete_openai(&prompt).await?,
            LlmProvider::Anthropic => self.complete_anthropic(&prompt).await?,
            LlmProvider::Gemini => self.complete_gemini(&prompt).await?,
        };

        trace!(action = %text, "model answered");
        Ok(text.trim().to_string())
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, AgentError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response: Value = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract(&response, &["choices", "0", "message", "content"])
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String, AgentError> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": 1024,
            "temperature": self.config.temperature,
            "system": SYSTEM_PROMPT,
            "messages": [ { "role": "user", "content": prompt } ],
        });

        let response: Value = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract(&response, &["content", "0", "text"])
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String, AgentError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.config.model
        );
        let body = json!({
            "system_instruction": { "parts": [ { "text": SYSTEM_PROMPT } ] },
            "contents": [ { "parts": [ { "text": prompt } ] } ],
            "generationConfig": { "temperature": self.config.temperature },
        });

        let response: Value = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract(
            &response,
            &["candidates", "0", "content", "parts", "0", "text"],
        )
    }
}

fn build_prompt(goal: &str, observation: &str, history: &[String]) -> String {
    let mut prompt = format!("Goal: {goal}\n\nCurrent UI state:\n{observation}\n");
    if !history.is_empty() {
        prompt.push_str("\nActions taken so far:\n");
        for (i, action) in history.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, action));
        }
    }
    prompt.push_str("\nNext action:");
    prompt
}

/// Walk a JSON response along `path`, where numeric segments index arrays.
fn extract(value: &Value, path: &[&str]) -> Result<String, AgentError> {
    let mut cursor = value;
    for segment in path {
        cursor = match segment.parse::<usize>() {
            Ok(idx) => cursor.get(idx),
            Err(_) => cursor.get(segment),
        }
        .ok_or_else(|| AgentError::Llm(format!("missing '{segment}' in provider response")))?;
    }

    cursor
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AgentError::Llm("provider response text is not a string".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_walks_objects_and_arrays() {
        let value = json!({ "choices": [ { "message": { "content": "ok" } } ] });
        let text = extract(&value, &["choices", "0", "message", "content"]).unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_extract_reports_missing_segment() {
        let value = json!({ "choices": [] });
        let err = extract(&value, &["choices", "0", "message"]).unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[test]
    fn test_prompt_lists_history_in_order() {
        let prompt = build_prompt(
            "Turn off wifi",
            "<ui/>",
            &["{\"action\":\"tap\"}".to_string(), "{\"action\":\"key\"}".to_string()],
        );
        let tap = prompt.find("1. {\"action\":\"tap\"}").unwrap();
        let key = prompt.find("2. {\"action\":\"key\"}").unwrap();
        assert!(tap < key);
    }
}
