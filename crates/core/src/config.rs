//! Configuration management for Charter.
//!
//! Configuration is layered, later layers winning:
//! - Built-in defaults
//! - Config file (`<workspace>/.charter/config.yaml` or an explicit path)
//! - Environment variables
//! - Command-line flags
//!
//! The workspace holds all on-disk state under `.charter/`: the config file,
//! prompt overrides and the vector index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat providers the LLM factory can build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Embedding providers the knowledge crate can build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Document profiles understood by the segmenter and the prompt set.
pub const KNOWN_PROFILES: [&str; 2] = ["english", "polish"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .charter/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active chat provider ("ollama", "openai")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Explicit API key (CHARTER_API_KEY), wins over provider apiKeyEnv
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Chat provider configurations
    pub llm: Option<LlmConfig>,

    /// Embedding model settings (stamped into the index at build time)
    pub embedding: EmbeddingSettings,

    /// Retrieval, history and retry settings
    pub rag: RagSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

/// Embedding model settings.
///
/// The provider/model/dimensions triple identifies the vector space. It is
/// written into the index manifest at build time and checked on every open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 32,
            endpoint: None,
        }
    }
}

/// Retrieval-augmented generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    /// Name of the persistent vector index
    pub index_name: String,

    /// Raw document used by `index build` (relative paths resolve against the workspace)
    pub source_path: PathBuf,

    /// Document profile: marker keywords, citations and prompt language
    pub profile: String,

    /// Number of passages retrieved per question
    pub top_k: usize,

    pub history: HistorySettings,

    /// Override for the profile's "no answer" sentence
    pub sentinel: Option<String>,

    /// Override for the profile's "no sources" marker
    pub no_sources: Option<String>,

    pub retry: RetrySettings,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            index_name: "constitution".to_string(),
            source_path: PathBuf::from("data/constitution.txt"),
            profile: "english".to_string(),
            top_k: 2,
            history: HistorySettings::default(),
            sentinel: None,
            no_sources: None,
            retry: RetrySettings::default(),
        }
    }
}

/// Conversation memory bounds. `None` disables a bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySettings {
    pub max_pairs: Option<usize>,
    pub max_tokens: Option<usize>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_pairs: Some(3),
            max_tokens: Some(2000),
        }
    }
}

/// Bounded retry around external model and index calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            timeout_secs: 30,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSettings>,
    rag: Option<RagSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `CHARTER_WORKSPACE`: Override workspace path
    /// - `CHARTER_CONFIG`: Path to config file
    /// - `CHARTER_PROVIDER`: Chat provider
    /// - `CHARTER_MODEL`: Chat model identifier
    /// - `CHARTER_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, letting explicit paths win over the environment.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("CHARTER_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("CHARTER_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.charter_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CHARTER_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CHARTER_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("CHARTER_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(mut self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            self.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                self.model = provider_config.model().to_string();
            }
            self.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            self.embedding = embedding;
        }

        if let Some(rag) = config_file.rag {
            self.rag = rag;
        }

        Ok(self)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .charter directory.
    pub fn charter_dir(&self) -> PathBuf {
        self.workspace.join(".charter")
    }

    /// Ensure the .charter directory exists.
    pub fn ensure_charter_dir(&self) -> AppResult<()> {
        let charter_dir = self.charter_dir();
        if !charter_dir.exists() {
            std::fs::create_dir_all(&charter_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .charter directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Source document path, resolved against the workspace when relative.
    pub fn source_path(&self) -> PathBuf {
        if self.rag.source_path.is_absolute() {
            self.rag.source_path.clone()
        } else {
            self.workspace.join(&self.rag.source_path)
        }
    }

    /// Get a provider's configuration block, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the endpoint for a provider from its configuration block.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.clone()),
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.clone(),
        }
    }

    /// Resolve the HTTP timeout for a provider, falling back to the retry timeout.
    pub fn resolve_timeout_secs(&self, provider: &str) -> u64 {
        let configured = match self.get_provider_config(provider) {
            Some(ProviderConfig::Ollama { timeout, .. })
            | Some(ProviderConfig::OpenAI { timeout, .. }) => *timeout,
            None => None,
        };
        configured.unwrap_or(self.rag.retry.timeout_secs)
    }

    /// Resolve API key: CHARTER_API_KEY first, then the provider's apiKeyEnv,
    /// then OPENAI_API_KEY for the openai provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider == "openai" {
            return std::env::var("OPENAI_API_KEY").ok();
        }

        None
    }

    /// Validate the configuration before any pipeline is built.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_PROFILES.contains(&self.rag.profile.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown document profile: {}. Supported: {}",
                self.rag.profile,
                KNOWN_PROFILES.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding dimensions and batchSize must be greater than zero".to_string(),
            ));
        }

        if self.rag.index_name.trim().is_empty() {
            return Err(AppError::Config("Index name cannot be empty".to_string()));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if self.rag.history.max_pairs == Some(0) {
            return Err(AppError::Config(
                "history.maxPairs must be at least 1 (omit it to disable the window)".to_string(),
            ));
        }

        if self.rag.retry.max_attempts == 0 || self.rag.retry.timeout_secs == 0 {
            return Err(AppError::Config(
                "retry.maxAttempts and retry.timeoutSecs must be at least 1".to_string(),
            ));
        }

        if self.provider == "openai" && self.resolve_api_key(&self.provider).is_none() {
            return Err(AppError::Config(
                "API key not found for provider openai (set CHARTER_API_KEY, OPENAI_API_KEY or apiKeyEnv)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}
