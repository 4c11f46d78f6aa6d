use crate::llm::client::{error_message, LLMClient, VisionClient};
use crate::types::{AppError, Message, MessageRole, Result};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        )
    }

    async fn post(&self, body: Value, fallback: &str) -> Result<Value> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::Provider(format!("Gemini request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::Provider(format!(
                "Failed to read Gemini response: {}",
                e.without_url()
            ))
        })?;

        if !status.is_success() {
            return Err(AppError::Provider(error_message(status, &text, fallback)));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| AppError::Provider(format!("Failed to parse Gemini response: {}", e)))?;

        // Some failures come back as 200 with an error object
        if let Some(message) = value.pointer("/error/message").and_then(|m| m.as_str()) {
            return Err(AppError::Provider(message.to_string()));
        }

        Ok(value)
    }

    /// First candidate's first text part, empty when the model returned nothing
    fn first_text(value: &Value) -> Option<String> {
        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
    }

    fn role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::Assistant => "model",
            MessageRole::User | MessageRole::System => "user",
        }
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let value = self.post(body, "Agent failed").await?;
        Ok(Self::first_text(&value).unwrap_or_default())
    }

    async fn generate_with_history(&self, system: &str, history: &[Message]) -> Result<String> {
        let contents: Vec<Value> = history
            .iter()
            .map(|m| json!({ "role": Self::role(m.role), "parts": [{ "text": m.content }] }))
            .collect();

        let body = json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": system }] }
        });

        let value = self.post(body, "Gemini API Error").await?;
        Ok(Self::first_text(&value).unwrap_or_default())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": instruction },
                    { "inline_data": { "mime_type": mime_type, "data": data } }
                ]
            }]
        });

        let value = self.post(body, "Gemini Vision Error").await?;
        Ok(Self::first_text(&value).unwrap_or_else(|| "No description generated.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new(
            "k".to_string(),
            "https://generativelanguage.googleapis.com/v1beta/".to_string(),
            "gemini-2.0-flash".to_string(),
        );
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=k"
        );
    }

    #[test]
    fn test_first_text() {
        let value = json!({
            "candidates": [{ "content": { "parts": [{ "text": "안녕하세요" }] } }]
        });
        assert_eq!(GeminiClient::first_text(&value).as_deref(), Some("안녕하세요"));
        assert_eq!(GeminiClient::first_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(GeminiClient::role(MessageRole::Assistant), "model");
        assert_eq!(GeminiClient::role(MessageRole::User), "user");
    }
}
