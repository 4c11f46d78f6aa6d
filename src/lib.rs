//! # ACIP - Conversational Intake & Research Orchestrator
//!
//! Interviews a user to extract their intent (topic, purpose, goal, proficiency,
//! constraints, resources), then dispatches that intent to a multi-agent research
//! pipeline: web search, cross-model analysis and synthesis into a structured report.
//!
//! ## Overview
//!
//! ACIP can be used in two ways:
//!
//! 1. **As a CLI** - Run the `acip` binary for an interactive chat
//! 2. **As a library** - Drive the [`DispatchController`] or [`ResearchPipeline`] yourself
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use acip::{AcipConfig, DispatchController, StoreProvider, TurnOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AcipConfig::load_or_default("acip.toml")?;
//!     let store = StoreProvider::from_config(&config.storage).create_store().await?;
//!     let controller = DispatchController::from_config(&config, store).await?;
//!
//!     let mut session = controller.open_session().await;
//!     let cancel = CancellationToken::new();
//!     match controller.handle_turn(&mut session, "연구 시작", &cancel).await {
//!         TurnOutcome::Report(report) => println!("{}", report.verified_truth),
//!         other => println!("{:?}", other),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `duckduckgo` | Keyless web search through daedra (default) |
//!
//! ## Modules
//!
//! - [`dispatch`] - Per-turn state machine: intake vs. research
//! - [`research`] - Search, parallel analysis, synthesis
//! - [`profiler`] - Mission classification
//! - [`intent`] - Versioned intent record and readiness gate
//! - [`sanitizer`] - Strips control directives from replies
//! - [`llm`] - Provider clients (Gemini, OpenAI, Ollama)
//! - [`tools`] - Web search providers
//! - [`db`] - Key-value storage (libsql)
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface: argument parsing, output, chat loop.
pub mod cli;
/// Key-value storage for the intent record, user name and credentials.
pub mod db;
/// Intent-gated dispatch controller and session state.
pub mod dispatch;
/// Intent model, store and readiness policy.
pub mod intent;
/// LLM provider clients and abstractions.
pub mod llm;
/// Conversation history windowing.
pub mod memory;
/// Mission profiler.
pub mod profiler;
/// Multi-agent research pipeline.
pub mod research;
/// Output sanitizer for conversational replies.
pub mod sanitizer;
/// Web search providers.
pub mod tools;
/// Core types and error handling.
pub mod types;
/// Configuration and text utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{KvStore, StoreProvider};
pub use dispatch::{ConversationState, DispatchController, DispatchPolicy, Session, TurnOutcome};
pub use intent::{IntentModel, IntentStore, ReadinessPolicy};
pub use llm::{LLMClient, Provider, VisionClient};
pub use profiler::{MissionMode, MissionProfile, MissionProfiler};
pub use research::{Report, ResearchPipeline, ResearchProgress};
pub use sanitizer::sanitize;
pub use tools::SearchProvider;
pub use types::{AppError, Result};
pub use utils::{AcipConfig, ConfigManager};
