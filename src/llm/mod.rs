//! LLM Provider Clients and Abstractions
//!
//! The research pipeline and dispatch controller only see the capability traits:
//! - [`LLMClient`] - single-turn and conversational completion
//! - [`VisionClient`] - image description
//!
//! Concrete clients are created from configuration through [`Provider`]. Calls made on
//! behalf of a user turn are wrapped in a [`CallGuard`] for timeout and cancellation.
//!
//! # Example
//!
//! ```ignore
//! use acip::llm::{LLMClient, Provider};
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! };
//! let client = provider.create_client();
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client traits and the provider factory.
pub mod client;
/// Timeout and cancellation wrapper for external calls.
pub mod guard;

pub mod gemini;
pub mod ollama;
pub mod openai;

pub use client::{LLMClient, Provider, VisionClient};
pub use guard::{CallGuard, Timeouts};
