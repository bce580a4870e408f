//! LLM provider selection.

use std::fmt;
use std::str::FromStr;

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl LlmProvider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
        };
        f.write_str(name)
    }
}

/// Model selection and sampling parameters for the agent's LLM calls.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Which provider to call.
    pub provider: LlmProvider,

    /// Model name (e.g. "gemini-2.5-pro").
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,
}

impl LlmConfig {
    /// Create a config with the given provider and model.
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.5,
        }
    }

    /// Builder method to set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!("Gemini".parse::<LlmProvider>(), Ok(LlmProvider::Gemini));
        assert_eq!("ANTHROPIC".parse::<LlmProvider>(), Ok(LlmProvider::Anthropic));
        assert_eq!("openai".parse::<LlmProvider>(), Ok(LlmProvider::OpenAi));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!("bard".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_api_key_env_per_provider() {
        assert_eq!(LlmProvider::OpenAi.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(LlmProvider::Gemini.api_key_env(), "GEMINI_API_KEY");
    }
}
