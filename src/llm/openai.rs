use crate::llm::client::{error_message, LLMClient};
use crate::types::{AppError, Message, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    /// Prepended to single-turn prompts
    system_prompt: Option<String>,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            temperature: 0.2,
            system_prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = Some(system_prompt).filter(|s| !s.trim().is_empty());
        self
    }

    async fn chat(&self, messages: Vec<Value>) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read OpenAI response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Provider(error_message(
                status,
                &text,
                "GPT Agent failed",
            )));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::Provider(format!("Failed to parse OpenAI response: {}", e)))?;

        Ok(value
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        self.chat(messages).await
    }

    async fn generate_with_history(&self, system: &str, history: &[Message]) -> Result<String> {
        let messages = std::iter::once(json!({ "role": "system", "content": system }))
            .chain(
                history
                    .iter()
                    .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
            )
            .collect();

        self.chat(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_system_prompt_is_dropped() {
        let client = OpenAIClient::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1/".to_string(),
            "gpt-4o-mini".to_string(),
        )
        .with_system_prompt("   ".to_string());

        assert!(client.system_prompt.is_none());
        assert_eq!(client.api_base, "https://api.openai.com/v1");
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_default_temperature() {
        let client = OpenAIClient::new(String::new(), String::new(), "m".to_string());
        assert!((client.temperature - 0.2).abs() < f32::EPSILON);
    }
}
