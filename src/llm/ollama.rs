use crate::llm::client::{error_message, LLMClient};
use crate::types::{AppError, Message, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Ollama `/api/chat` client (non-streaming)
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    async fn chat(&self, messages: Vec<Value>) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(error_message(
                status,
                &text,
                "Ollama request failed",
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return Err(AppError::Provider(error.to_string()));
        }

        Ok(value
            .pointer("/message/content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![json!({ "role": "user", "content": prompt })])
            .await
    }

    async fn generate_with_history(&self, system: &str, history: &[Message]) -> Result<String> {
        let mut messages = vec![json!({ "role": "system", "content": system })];
        messages.extend(
            history
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );
        self.chat(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
