//! Configuration management.

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration for mathmentor.
#[derive(Debug, Clone)]
pub struct MentorConfig {
    /// Directory holding the memory log and the persisted index.
    pub data_dir: PathBuf,
    /// Directory holding the knowledge corpus as `.txt` documents.
    pub corpus_dir: PathBuf,
    /// Retrieval tuning.
    pub retrieval: RetrievalConfig,
    /// Recall tuning.
    pub recall: RecallConfig,
    /// LLM provider configuration.
    pub llm: LlmConfig,
}

/// Retrieval tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Passages returned per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
        }
    }
}

/// Recall tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct RecallConfig {
    /// Minimum Jaccard similarity for a past interaction to surface.
    pub similarity_threshold: f32,
    /// Maximum interactions returned per recall.
    pub limit: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            limit: 3,
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Provider name: "groq" or "ollama".
    pub provider: LlmProvider,
    /// Model name.
    pub model: Option<String>,
    /// API key. Clients also read their provider's environment variable.
    pub api_key: Option<String>,
    /// Base URL for the provider (for self-hosted or proxied endpoints).
    pub base_url: Option<String>,
    /// Request timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout override in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Available LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq hosted inference, the default.
    #[default]
    Groq,
    /// Ollama (local).
    Ollama,
}

impl LlmProvider {
    /// Parses a provider string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            _ => Self::Groq,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Corpus directory.
    pub corpus_dir: Option<String>,
    /// Retrieval section.
    pub retrieval: Option<ConfigFileRetrieval>,
    /// Recall section.
    pub recall: Option<ConfigFileRecall>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
}

/// Retrieval section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetrieval {
    /// Chunk size in characters.
    pub chunk_size: Option<usize>,
    /// Chunk overlap in characters.
    pub chunk_overlap: Option<usize>,
    /// Passages per query.
    pub top_k: Option<usize>,
}

/// Recall section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRecall {
    /// Similarity threshold.
    pub similarity_threshold: Option<f32>,
    /// Result limit.
    pub limit: Option<usize>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".mathmentor"),
            corpus_dir: PathBuf::from("knowledge_base"),
            retrieval: RetrievalConfig::default(),
            recall: RecallConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl MentorConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the interaction log inside the data directory.
    #[must_use]
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join("memory.json")
    }

    /// Path of the persisted knowledge index inside the data directory.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.json")
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/mathmentor/` on macOS)
    /// 2. XDG config dir (`~/.config/mathmentor/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found. Environment
    /// overrides are applied in every case.
    #[must_use]
    pub fn load_default() -> Self {
        Self::load_default_file().with_env_overrides()
    }

    fn load_default_file() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("mathmentor")
            .join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        // Fall back to XDG-style ~/.config/mathmentor/ for Unix compatibility
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("mathmentor")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `MentorConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(corpus_dir) = file.corpus_dir {
            config.corpus_dir = PathBuf::from(corpus_dir);
        }
        if let Some(retrieval) = file.retrieval {
            if let Some(v) = retrieval.chunk_size {
                config.retrieval.chunk_size = v;
            }
            if let Some(v) = retrieval.chunk_overlap {
                config.retrieval.chunk_overlap = v;
            }
            if let Some(v) = retrieval.top_k {
                config.retrieval.top_k = v;
            }
        }
        if let Some(recall) = file.recall {
            if let Some(v) = recall.similarity_threshold {
                config.recall.similarity_threshold = v;
            }
            if let Some(v) = recall.limit {
                config.recall.limit = v;
            }
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = LlmProvider::parse(&provider);
            }
            config.llm.model = llm.model;
            config.llm.api_key = llm.api_key;
            config.llm.base_url = llm.base_url;
            config.llm.timeout_ms = llm.timeout_ms;
            config.llm.connect_timeout_ms = llm.connect_timeout_ms;
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MATHMENTOR_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MATHMENTOR_CORPUS_DIR") {
            self.corpus_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MATHMENTOR_LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&v);
        }
        if let Ok(v) = std::env::var("MATHMENTOR_LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Ok(v) = std::env::var("MATHMENTOR_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the corpus directory.
    #[must_use]
    pub fn with_corpus_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.corpus_dir = path.into();
        self
    }
}
