//! Init command implementation
//!
//! Scaffolds an ACIP project: `acip.toml`, `.env.example`, `.gitignore` and the
//! `data/` directory that holds the session database.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (acip.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing ACIP Project");

    let base_path = &config.path;

    let config_path = base_path.join("acip.toml");
    if config_path.exists() && !config.force {
        output.warning("acip.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating directories");
    let data_dir = base_path.join("data");
    if !data_dir.exists() {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.error(&format!("Failed to create data: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir("data");
    } else {
        output.skipped("data", "already exists");
    }

    output.subheader("Creating configuration files");

    if let Err(e) = write_file(&config_path, &generate_acip_toml(), config.force) {
        output.error(&format!("Failed to create acip.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "acip.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        if let Err(e) = write_file(&gitignore_path, &generate_gitignore(), false) {
            output.warning(&format!("Failed to create .gitignore: {}", e));
        } else {
            output.created("file", ".gitignore");
        }
    }

    output.complete("ACIP project initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Provide credentials (environment or key store):");
    output.command("cp .env.example .env");
    output.command("acip key set GEMINI_API_KEY <key>");
    output.newline();
    output.info("2. Start chatting:");
    output.command("acip");
    output.newline();

    output.hint("OPENAI_API_KEY enables cross-check analysis; TAVILY_API_KEY enables live web search");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_acip_toml() -> String {
    r#"# ACIP configuration
# Credentials are never stored here. Each provider names the variable that holds its key;
# the value is read from the environment first, then from the key store (`acip key set`).

[app]
log_level = "info"
session_id = "default"

# Primary provider: conversation, profiling, analysis, vision
[providers.gemini]
type = "gemini"
api_key_env = "GEMINI_API_KEY"
api_base = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-2.0-flash"

# Secondary provider: cross-check analysis and final synthesis
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-4o-mini"
temperature = 0.2

# Local alternative (no key required)
# [providers.local]
# type = "ollama"
# base_url = "http://localhost:11434"
# model = "llama3.2"

[research]
primary = "gemini"
# Leave empty to run without a cross-check provider
secondary = "openai"
max_query_chars = 100

[search]
# tavily | duckduckgo | none
provider = "tavily"
api_key_env = "TAVILY_API_KEY"
max_results = 5
search_depth = "basic"

[dispatch]
# How many of topic / purpose / goal must be known before research starts on its own
readiness_threshold = 2
min_field_chars = 5
history_window = 20
trigger_phrases = ["연구 시작", "리서치 시작"]

[timeouts]
llm_secs = 60
search_secs = 20

[storage]
# libsql | memory
backend = "libsql"
path = "./data/acip.db"
"#
    .to_string()
}

fn generate_env_example() -> String {
    r#"# ACIP environment variables
# Copy to .env and fill in the keys you have.

# Required: primary provider
GEMINI_API_KEY=

# Optional: enables cross-check analysis and synthesis
OPENAI_API_KEY=

# Optional: enables live web search
TAVILY_API_KEY=

# Log filter override, e.g. acip=debug
# RUST_LOG=info
"#
    .to_string()
}

fn generate_gitignore() -> String {
    r#"# Environment
.env

# Session database
data/
*.db

# Build
target/
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::AcipConfig;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, force: bool) -> InitConfig {
        InitConfig {
            path: dir.path().to_path_buf(),
            force,
        }
    }

    #[test]
    fn test_generated_toml_is_valid_config() {
        let config = AcipConfig::from_toml_str(&generate_acip_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.research.primary, "gemini");
        assert_eq!(config.dispatch.trigger_phrases, vec!["연구 시작", "리서치 시작"]);
    }

    #[test]
    fn test_env_example_has_no_values() {
        let env = generate_env_example();
        for line in env.lines().filter(|l| l.ends_with('=')) {
            assert!(line.ends_with("_API_KEY="));
        }
        assert!(env.contains("TAVILY_API_KEY="));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "original").unwrap();

        write_file(&path, "new", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");

        write_file(&path, "new", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_run_creates_all_files() {
        let dir = TempDir::new().unwrap();
        let result = run(config_for(&dir, false), &Output::no_color());

        assert_eq!(result, InitResult::Success);
        assert!(dir.path().join("acip.toml").exists());
        assert!(dir.path().join(".env.example").exists());
        assert!(dir.path().join(".gitignore").exists());
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("acip.toml"), "existing").unwrap();

        let result = run(config_for(&dir, false), &Output::no_color());
        assert_eq!(result, InitResult::AlreadyExists);
        assert_eq!(
            fs::read_to_string(dir.path().join("acip.toml")).unwrap(),
            "existing"
        );
    }

    #[test]
    fn test_run_force_overwrites() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("acip.toml"), "existing").unwrap();

        let result = run(config_for(&dir, true), &Output::no_color());
        assert_eq!(result, InitResult::Success);

        let content = fs::read_to_string(dir.path().join("acip.toml")).unwrap();
        assert!(content.contains("[research]"));
        assert!(!content.contains("existing"));
    }
}
