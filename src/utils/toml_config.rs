//! TOML-based configuration for ACIP
//!
//! Providers, research roles, search, dispatch policy, timeouts and storage are
//! declared in `acip.toml`. Every field carries a serde default, so an empty or
//! missing file still yields a runnable configuration.
//!
//! # Hot Reloading
//!
//! `ConfigManager` keeps the current configuration behind an `ArcSwap` and can watch
//! the file for changes. The chat loop re-reads the dispatch policy every turn, so
//! readiness threshold and trigger phrases can be tuned without a restart.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from acip.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcipConfig {
    #[serde(default)]
    pub app: AppConfig,

    /// Named LLM provider configurations
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderConfig>,

    /// Which providers play the primary / secondary research roles
    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub search: SearchConfig,

    /// Intake gating policy
    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for AcipConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            providers: default_providers(),
            research: ResearchConfig::default(),
            search: SearchConfig::default(),
            dispatch: DispatchConfig::default(),
            timeouts: TimeoutConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert(
        "gemini".to_string(),
        ProviderConfig::Gemini {
            api_key_env: default_gemini_key_env(),
            api_base: default_gemini_base(),
            model: default_gemini_model(),
        },
    );
    providers.insert(
        "openai".to_string(),
        ProviderConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            model: default_openai_model(),
            temperature: default_secondary_temperature(),
            system_prompt: default_research_system_prompt(),
        },
    );
    providers
}

// ============= App Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fixed key under which the single session's intent record is persisted
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_id() -> String {
    "default".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            session_id: default_session_id(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        /// Environment variable (or stored key) holding the API key
        #[serde(default = "default_gemini_key_env")]
        api_key_env: String,
        #[serde(default = "default_gemini_base")]
        api_base: String,
        #[serde(default = "default_gemini_model")]
        model: String,
    },
    OpenAI {
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_secondary_temperature")]
        temperature: f32,
        #[serde(default = "default_research_system_prompt")]
        system_prompt: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
}

impl ProviderConfig {
    /// Name of the credential this provider needs, if any
    pub fn credential_env(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { api_key_env, .. } => Some(api_key_env),
            ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Gemini { .. } => "gemini",
            ProviderConfig::OpenAI { .. } => "openai",
            ProviderConfig::Ollama { .. } => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Gemini { model, .. }
            | ProviderConfig::OpenAI { model, .. }
            | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_secondary_temperature() -> f32 {
    0.2
}

fn default_research_system_prompt() -> String {
    "You are a precise research agent. Provide factual, structured, verifiable results in JSON format."
        .to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Provider used for conversation, profiling and primary analysis
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Optional cross-check provider; an empty string disables it
    #[serde(default = "default_secondary")]
    pub secondary: String,

    /// Upper bound on the mission text used as a search query
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

impl ResearchConfig {
    pub fn secondary_name(&self) -> Option<&str> {
        let name = self.secondary.trim();
        (!name.is_empty()).then_some(name)
    }
}

fn default_primary() -> String {
    "gemini".to_string()
}

fn default_secondary() -> String {
    "openai".to_string()
}

fn default_max_query_chars() -> usize {
    100
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Tavily,
    DuckDuckGo,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_backend")]
    pub provider: SearchBackend,

    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_tavily_base")]
    pub api_base: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_depth")]
    pub search_depth: String,
}

fn default_search_backend() -> SearchBackend {
    SearchBackend::Tavily
}

fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_tavily_base() -> String {
    "https://api.tavily.com".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_depth() -> String {
    "basic".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_backend(),
            api_key_env: default_tavily_key_env(),
            api_base: default_tavily_base(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
        }
    }
}

// ============= Dispatch Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How many of topic / purpose / goal must be filled before research auto-starts
    #[serde(default = "default_readiness_threshold")]
    pub readiness_threshold: usize,

    /// A field counts as filled when its trimmed length exceeds this many characters
    #[serde(default = "default_min_field_chars")]
    pub min_field_chars: usize,

    /// Number of conversation messages sent to the conversational model
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Phrases that force research regardless of intake completeness
    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,
}

fn default_readiness_threshold() -> usize {
    2
}

fn default_min_field_chars() -> usize {
    5
}

fn default_history_window() -> usize {
    crate::memory::DEFAULT_HISTORY_WINDOW
}

fn default_trigger_phrases() -> Vec<String> {
    vec!["연구 시작".to_string(), "리서치 시작".to_string()]
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            readiness_threshold: default_readiness_threshold(),
            min_field_chars: default_min_field_chars(),
            history_window: default_history_window(),
            trigger_phrases: default_trigger_phrases(),
        }
    }
}

// ============= Timeouts & Storage =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_llm_secs")]
    pub llm_secs: u64,
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,
}

fn default_llm_secs() -> u64 {
    60
}

fn default_search_secs() -> u64 {
    20
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_secs: default_llm_secs(),
            search_secs: default_search_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Libsql,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Libsql
}

fn default_storage_path() -> String {
    "./data/acip.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    UnusedProvider,
    MissingCredential,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provider '{0}' referenced by '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl AcipConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the file if it exists, otherwise fall back to built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::FileNotFound(missing)) => {
                info!("No config at {:?}, using built-in defaults", missing);
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AcipConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate referential integrity and value ranges
    ///
    /// Credentials are deliberately not checked here: a key may live in the key-value
    /// store rather than the environment. Unset env vars surface as warnings instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.providers.contains_key(&self.research.primary) {
            return Err(ConfigError::MissingProvider(
                self.research.primary.clone(),
                "research.primary".to_string(),
            ));
        }

        if let Some(secondary) = self.research.secondary_name() {
            if !self.providers.contains_key(secondary) {
                return Err(ConfigError::MissingProvider(
                    secondary.to_string(),
                    "research.secondary".to_string(),
                ));
            }
        }

        if self.research.max_query_chars == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_query_chars must be greater than 0".to_string(),
            ));
        }

        for (name, provider) in &self.providers {
            if provider.model().trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Provider '{}' has an empty model name",
                    name
                )));
            }
            if let ProviderConfig::OpenAI { temperature, .. } = provider {
                if !(0.0..=2.0).contains(temperature) {
                    return Err(ConfigError::ValidationError(format!(
                        "Provider '{}' temperature {} is outside 0.0..=2.0",
                        name, temperature
                    )));
                }
            }
        }

        if !(1..=3).contains(&self.dispatch.readiness_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "dispatch.readiness_threshold must be between 1 and 3, got {}",
                self.dispatch.readiness_threshold
            )));
        }

        if self.dispatch.trigger_phrases.is_empty()
            || self
                .dispatch
                .trigger_phrases
                .iter()
                .any(|p| p.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "dispatch.trigger_phrases must contain at least one non-empty phrase".to_string(),
            ));
        }

        if self.dispatch.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.history_window must be greater than 0".to_string(),
            ));
        }

        if self.timeouts.llm_secs == 0 || self.timeouts.search_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than 0 seconds".to_string(),
            ));
        }

        if self.search.provider != SearchBackend::None && self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Libsql && self.storage.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.path is required for the libsql backend".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate configuration, returning warnings for unused providers and unset credentials
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unused_providers());
        warnings.extend(self.check_missing_credentials());
        Ok(warnings)
    }

    fn check_unused_providers(&self) -> Vec<ConfigWarning> {
        let mut unused: Vec<_> = self
            .providers
            .keys()
            .filter(|name| {
                name.as_str() != self.research.primary
                    && Some(name.as_str()) != self.research.secondary_name()
            })
            .collect();
        unused.sort();

        unused
            .into_iter()
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedProvider,
                message: format!(
                    "Provider '{}' is defined but not used by any research role",
                    name
                ),
            })
            .collect()
    }

    fn check_missing_credentials(&self) -> Vec<ConfigWarning> {
        let mut envs: Vec<&str> = self
            .role_providers()
            .filter_map(|(_, p)| p.credential_env())
            .collect();
        if self.search.provider == SearchBackend::Tavily {
            envs.push(&self.search.api_key_env);
        }
        envs.dedup();

        envs.into_iter()
            .filter(|env| self.resolve_env(env).is_none())
            .map(|env| ConfigWarning {
                kind: ConfigWarningKind::MissingCredential,
                message: format!(
                    "Environment variable '{}' is not set (a stored key will be used if present)",
                    env
                ),
            })
            .collect()
    }

    /// Providers referenced by the primary and secondary roles, in that order
    pub fn role_providers(&self) -> impl Iterator<Item = (&str, &ProviderConfig)> {
        std::iter::once(self.research.primary.as_str())
            .chain(self.research.secondary_name())
            .filter_map(move |name| self.providers.get(name).map(|p| (name, p)))
    }

    /// Get a resolved, non-empty value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.llm_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.search_secs)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct ConfigManager {
    config: Arc<ArcSwap<AcipConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
    reload_tx: Option<mpsc::UnboundedSender<()>>,
}

impl ConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = AcipConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
            reload_tx: None,
        })
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<AcipConfig> {
        self.config.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = AcipConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        self.reload_tx = Some(tx.clone());

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        // debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|t| t.elapsed() < debounce_duration) {
                    continue;
                }

                // Let the editor finish writing
                tokio::time::sleep(Duration::from_millis(100)).await;

                match AcipConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }

    /// Create a config manager directly from a config (no file watching)
    pub fn from_config(config: AcipConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("acip.toml"),
            watcher: RwLock::new(None),
            reload_tx: None,
        }
    }
}

impl Clone for ConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
            reload_tx: self.reload_tx.clone(),
        }
    }
}
