//! Configuration and shared helpers.

pub mod credentials;
pub mod text;
pub mod toml_config;

pub use toml_config::{AcipConfig, ConfigError, ConfigManager, ConfigWarning, ConfigWarningKind};
