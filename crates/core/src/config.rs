//! Configuration management for Sage.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - A YAML config file (`.sage/config.yaml` in the workspace, or `SAGE_CONFIG`)
//! - Environment variables (a `.env` file in the working directory is honoured)
//! - Command-line flags
//!
//! The configuration is workspace-centric: the corpus and the built index live
//! under the workspace unless absolute paths are given.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Generation providers the factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Embedding providers the embedding factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["mock", "ollama", "remote"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .sage/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active generation provider ("ollama", "openai")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Log line format
    pub log_format: LogFormat,

    pub corpus: CorpusConfig,

    pub index: IndexConfig,

    pub embedding: EmbeddingConfig,

    pub generation: GenerationConfig,

    /// Generation provider configurations
    pub llm: Option<LlmConfig>,
}

/// Where documents come from and how they are cut into chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusConfig {
    /// Corpus directory (relative paths resolve against the workspace)
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,

    /// Chunk window size in characters
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(rename = "chunkOverlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Where the built index generations are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".sage/index")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
        }
    }
}

/// Embedding backend configuration.
///
/// The same configuration must be used to build an index and to query it;
/// the provider, model and dimensions are recorded in the index manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "remote"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default)]
    pub normalize: bool,

    /// Maximum number of texts per backend request
    #[serde(rename = "batchSize", default = "default_batch_size")]
    pub batch_size: usize,

    /// Batches in flight at once during an index build
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Backend base URL (provider default when absent)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the backend credential
    #[serde(rename = "apiKeyEnv", default)]
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds
    #[serde(rename = "timeoutSecs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String {
    "mock".to_string()
}

fn default_embedding_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            normalize: false,
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            endpoint: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Hard cap on generated tokens
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeoutSecs", default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    /// Chunks retrieved when the caller does not say
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Subject area the assistant answers about
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Fixed sentence used to decline out-of-domain questions
    #[serde(default = "default_refusal")]
    pub refusal: String,
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_top_k() -> usize {
    5
}

fn default_domain() -> String {
    "the documents in this corpus".to_string()
}

fn default_refusal() -> String {
    "I could not find any explicit ruling or reference in the available material.".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
            top_k: default_top_k(),
            domain: default_domain(),
            refusal: default_refusal(),
        }
    }
}

/// Generation provider configuration from config.yaml.
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
    /// Any OpenAI-compatible chat completions API (OpenAI, Groq, vLLM, ...)
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    corpus: Option<CorpusConfig>,
    index: Option<IndexConfig>,
    embedding: Option<EmbeddingConfig>,
    generation: Option<GenerationConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_format: LogFormat::default(),
            corpus: CorpusConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `SAGE_WORKSPACE`: Override workspace path
    /// - `SAGE_CONFIG`: Path to config file
    /// - `SAGE_PROVIDER`: Generation provider
    /// - `SAGE_MODEL`: Generation model identifier
    /// - `SAGE_EMBEDDING_PROVIDER`: Embedding provider
    /// - `SAGE_EMBEDDING_MODEL`: Embedding model identifier
    /// - `SAGE_CORPUS_DIR`: Corpus directory
    /// - `SAGE_INDEX_DIR`: Index directory
    /// - `SAGE_LOG_FORMAT`: Log line format (`text` or `json`)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use sage_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus: {:?}", config.corpus_dir());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// Given values win over `SAGE_WORKSPACE` and `SAGE_CONFIG`. They are
    /// fixed before the YAML is read, so the file that is merged is the one
    /// belonging to the chosen workspace.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        // Credentials commonly live in a local .env file.
        dotenv::dotenv().ok();

        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("SAGE_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        config.config_file =
            config_file.or_else(|| std::env::var("SAGE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.sage_dir().join("config.yaml"),
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
        if let Ok(provider) = std::env::var("SAGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SAGE_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("SAGE_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("SAGE_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(dir) = std::env::var("SAGE_CORPUS_DIR") {
            config.corpus.dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("SAGE_INDEX_DIR") {
            config.index.dir = PathBuf::from(dir);
        }

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        if let Ok(format) = std::env::var("SAGE_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        if let Some(corpus) = file.corpus {
            self.corpus = corpus;
        }

        if let Some(index) = file.index {
            self.index = index;
        }

        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }

        if let Some(generation) = file.generation {
            self.generation = generation;
        }

        if let Some(llm) = file.llm {
            self.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                self.model = provider_config.model().to_string();
            }

            self.llm = Some(llm);
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    /// The workspace and config file are not overrides; pass them to
    /// [`AppConfig::load_with`].
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

    /// Get the path to the .sage directory.
    pub fn sage_dir(&self) -> PathBuf {
        self.workspace.join(".sage")
    }

    /// Corpus directory, resolved against the workspace.
    pub fn corpus_dir(&self) -> PathBuf {
        self.resolve(&self.corpus.dir)
    }

    /// Index directory, resolved against the workspace.
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.index.dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the configuration of a generation provider, if one was declared.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Which client implementation serves a provider name.
    ///
    /// Declared providers may use any name ("groq", "local"); their variant
    /// decides the kind. Undeclared names must be a known kind.
    pub fn provider_kind(&self, provider: &str) -> Option<&'static str> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { .. }) => Some("openai"),
            Some(ProviderConfig::Ollama { .. }) => Some("ollama"),
            None => KNOWN_PROVIDERS.iter().copied().find(|known| *known == provider),
        }
    }

    /// Resolve the generation API key from the environment.
    ///
    /// Providers declaring `apiKeyEnv` must find the variable set; a missing
    /// credential is a configuration error, not a per-request failure.
    pub fn resolve_api_key(&self, provider: &str) -> AppResult<Option<String>> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => {
                read_secret(api_key_env).map(Some)
            }
            Some(ProviderConfig::Ollama { .. }) => Ok(None),
            None if provider == "openai" => Err(AppError::Config(
                "Provider 'openai' requires an llm.providers.openai entry with apiKeyEnv"
                    .to_string(),
            )),
            None => Ok(None),
        }
    }

    /// Resolve the embedding API key from the environment.
    pub fn resolve_embedding_api_key(&self) -> AppResult<Option<String>> {
        match self.embedding.api_key_env {
            Some(ref env_var) => read_secret(env_var).map(Some),
            None if self.embedding.provider == "remote" => Err(AppError::Config(
                "Embedding provider 'remote' requires embedding.apiKeyEnv".to_string(),
            )),
            None => Ok(None),
        }
    }

    /// Validate configuration before any work is done.
    pub fn validate(&self) -> AppResult<()> {
        let corpus = &self.corpus;
        if corpus.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be at least 1".to_string()));
        }
        if corpus.chunk_overlap >= corpus.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                corpus.chunk_overlap, corpus.chunk_size
            )));
        }

        if self.provider_kind(&self.provider).is_none() {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        self.resolve_api_key(&self.provider)?;

        let embedding = &self.embedding;
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }
        if embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        if embedding.batch_size == 0 || embedding.concurrency == 0 {
            return Err(AppError::Config(
                "embedding.batchSize and embedding.concurrency must be at least 1".to_string(),
            ));
        }
        self.resolve_embedding_api_key()?;

        if self.generation.top_k == 0 {
            return Err(AppError::Config(
                "generation.topK must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn read_secret(env_var: &str) -> AppResult<String> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "API key not found in environment variable: {}",
            env_var
        ))),
    }
}
