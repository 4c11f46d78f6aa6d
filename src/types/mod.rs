use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= Conversation Types =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Network, auth or non-success response from an external provider.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Credential not configured: {0}")]
    CredentialMissing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Timeouts count as provider failures: the caller degrades the same way.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AppError::Provider(_) | AppError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }

    /// The inner message without the variant prefix, as shown to the user
    pub fn message(&self) -> &str {
        match self {
            AppError::Provider(msg)
            | AppError::Timeout(msg)
            | AppError::CredentialMissing(msg)
            | AppError::Storage(msg)
            | AppError::Config(msg)
            | AppError::InvalidInput(msg)
            | AppError::Internal(msg) => msg,
            AppError::Cancelled => "Cancelled",
        }
    }
}

impl From<crate::utils::toml_config::ConfigError> for AppError {
    fn from(err: crate::utils::toml_config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_classification() {
        assert!(AppError::Provider("503".to_string()).is_provider_failure());
        assert!(AppError::Timeout("llm".to_string()).is_provider_failure());
        assert!(!AppError::Cancelled.is_provider_failure());
        assert!(!AppError::Storage("disk".to_string()).is_provider_failure());
        assert!(AppError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_error_message_drops_prefix() {
        let err = AppError::Provider("API key not valid".to_string());
        assert_eq!(err.to_string(), "Provider error: API key not valid");
        assert_eq!(err.message(), "API key not valid");
        assert_eq!(AppError::Cancelled.message(), "Cancelled");
    }

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.content, "hello");

        let assistant = Message::assistant("hi");
        assert_eq!(assistant.role.as_str(), "assistant");
    }

    #[test]
    fn test_message_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
