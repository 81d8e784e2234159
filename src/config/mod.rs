
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::EMBEDDING_DIMENSION;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub visitjeju: VisitJejuConfig,
    /// Queries whose embeddings are precomputed into the cache ahead of
    /// serving traffic.
    #[serde(default = "default_warmup_queries")]
    pub warmup_queries: Vec<String>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
            embedding_dimension: EMBEDDING_DIMENSION as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisitJejuConfig {
    pub api_base: String,
    pub locale: String,
}

impl Default for VisitJejuConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.visitjeju.net/vsjApi/contents/searchList".to_string(),
            locale: "kr".to_string(),
        }
    }
}

fn default_warmup_queries() -> Vec<String> {
    [
        "제주 해녀 체험",
        "제주도 해녀 체험",
        "제주도 해녀 체험 프로그램",
        "제주 전통 요리",
        "제주 전통 요리 체험",
        "제주 돌담 쌓기",
        "제주 감귤 수확",
        "제주 목공 체험",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid API base URL: {0}")]
    InvalidApiBase(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid locale: {0} (cannot be empty)")]
    InvalidLocale(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for crate::RagError {
    #[inline]
    fn from(e: ConfigError) -> Self {
        crate::RagError::Config(e.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            visitjeju: VisitJejuConfig::default(),
            warmup_queries: default_warmup_queries(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.visitjeju.validate()
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Directory holding the built index, metadata, and embedding cache.
    #[inline]
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join("output")
    }

    #[inline]
    pub fn corpus_path(&self) -> PathBuf {
        self.output_dir().join("visitjeju_workshops.json")
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.output_dir().join("visitjeju_flat.index")
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir().join("visitjeju_metadata.json")
    }

    #[inline]
    pub fn embedding_cache_path(&self) -> PathBuf {
        self.output_dir().join("embedding_cache.json")
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|_| ConfigError::InvalidApiBase(self.api_base.clone()))
    }
}

impl VisitJejuConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.locale.trim().is_empty() {
            return Err(ConfigError::InvalidLocale(self.locale.clone()));
        }

        Ok(())
    }

    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|_| ConfigError::InvalidApiBase(self.api_base.clone()))
    }
}

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("jeju-rag"))
        .ok_or(ConfigError::DirectoryError)
}
