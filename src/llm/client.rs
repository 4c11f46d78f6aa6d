//! LLM Client abstractions and provider management
//!
//! Three capabilities are exposed to the rest of the crate:
//! - **Single completion**: stateless one-shot prompt (profiling, analysis, synthesis)
//! - **Conversational completion**: multi-turn history plus a system instruction (intake)
//! - **Vision**: describe an image (Gemini only)
//!
//! Providers are plain HTTP clients over `reqwest`:
//! - **Gemini**: `generateContent` REST API
//! - **OpenAI**: chat completions (and compatible APIs)
//! - **Ollama**: local `/api/chat`

use crate::types::{Message, Result};
use crate::utils::toml_config::ProviderConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Stateless single-turn completion
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Multi-turn completion over `history` under a system instruction
    async fn generate_with_history(&self, system: &str, history: &[Message]) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Image description capability
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String>;
}

/// Provider enum for runtime selection
///
/// | Provider | Conversation | Vision | Notes |
/// |----------|--------------|--------|-------|
/// | Gemini | ✅ | ✅ | Default primary |
/// | OpenAI | ✅ | - | Default secondary, sends a fixed system message |
/// | Ollama | ✅ | - | Local, no credential |
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini `generateContent` API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "AIza...".to_string(),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.0-flash".to_string(),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// OpenAI chat completions (including compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
        system_prompt: String,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Build a provider from its configuration and a resolved credential.
    ///
    /// # Errors
    ///
    /// `AppError::CredentialMissing` when the provider needs a key and none was resolved.
    pub fn from_config(config: &ProviderConfig, api_key: Option<String>) -> Result<Self> {
        let require_key = |env: &str| {
            api_key
                .clone()
                .ok_or_else(|| crate::types::AppError::CredentialMissing(env.to_string()))
        };

        Ok(match config {
            ProviderConfig::Gemini {
                api_key_env,
                api_base,
                model,
            } => Provider::Gemini {
                api_key: require_key(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            },
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
                temperature,
                system_prompt,
            } => Provider::OpenAI {
                api_key: require_key(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
                temperature: *temperature,
                system_prompt: system_prompt.clone(),
            },
            ProviderConfig::Ollama { base_url, model } => Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            },
        })
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Arc<dyn LLMClient> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
            } => Arc::new(super::gemini::GeminiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )),
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
                system_prompt,
            } => Arc::new(
                super::openai::OpenAIClient::new(api_key.clone(), api_base.clone(), model.clone())
                    .with_temperature(*temperature)
                    .with_system_prompt(system_prompt.clone()),
            ),
            Provider::Ollama { base_url, model } => Arc::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
            )),
        }
    }

    /// Create a vision client if this provider supports image input
    pub fn create_vision_client(&self) -> Option<Arc<dyn VisionClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
            } => Some(Arc::new(super::gemini::GeminiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),
            _ => None,
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

/// Pull `error.message` out of a provider error body, falling back to the raw text.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str, fallback: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.is_empty());

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => format!("{} ({})", fallback, status),
        None => format!("{} ({}): {}", fallback, status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppError;

    fn gemini_config() -> ProviderConfig {
        ProviderConfig::Gemini {
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        let result = Provider::from_config(&gemini_config(), None);
        assert!(
            matches!(result, Err(AppError::CredentialMissing(env)) if env == "GEMINI_API_KEY")
        );
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = ProviderConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        };
        let provider = Provider::from_config(&config, None).unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert!(provider.create_vision_client().is_none());
        assert_eq!(provider.create_client().model_name(), "llama3.2");
    }

    #[test]
    fn test_gemini_supports_vision() {
        let provider = Provider::from_config(&gemini_config(), Some("key".to_string())).unwrap();
        assert_eq!(provider.name(), "Gemini");
        assert!(provider.create_vision_client().is_some());
        assert_eq!(provider.create_client().model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_error_message_extraction() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"error":{"message":"API key not valid"}}"#, "Gemini API Error"),
            "API key not valid"
        );
        assert_eq!(
            error_message(status, "", "Agent failed"),
            "Agent failed (400 Bad Request)"
        );
        assert!(error_message(status, "upstream down", "Agent failed").ends_with("upstream down"));
    }
}
