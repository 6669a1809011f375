//! Configuration management with environment variable support
//!
//! Secrets come from dotenv files (`resources/.env`, `resources/llm/.env`)
//! or the process environment. The server refuses to start without them.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::synthesis::llm::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::vector_store::VectorStoreConfig;

/// Dotenv files read at startup, in order. Earlier values win.
pub const DOTENV_FILES: [&str; 2] = ["resources/.env", "resources/llm/.env"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set. Check resources/.env or the environment")]
    MissingVar(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which vector store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    LanceDb,
    Memory,
}

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// Language-model API key
    pub openai_api_key: String,
    /// Shared secret for mutating endpoints
    pub api_password: String,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Directory of the persistent vector store
    pub data_dir: PathBuf,
    /// Directory of prompt templates
    pub prompts_dir: PathBuf,
    /// Completion API base URL
    pub openai_base_url: String,
    /// Completion model identifier
    pub openai_model: String,
    /// Completion token budget
    pub max_tokens: u32,
    pub backend: BackendKind,
    /// Enable debug logging
    pub debug: bool,
}

impl Config {
    /// Read configuration from the process environment
    ///
    /// Supported environment variables:
    /// - OPENAI_API_KEY: language-model API key (required)
    /// - API_PASSWORD: shared secret for mutating endpoints (required)
    /// - BIND_ADDR: listen address (default: 0.0.0.0:8000)
    /// - DATA_DIR: vector store directory (default: vectorstore)
    /// - PROMPTS_DIR: prompt template directory (default: resources/prompts)
    /// - OPENAI_BASE_URL: completion API base (default: https://api.openai.com/v1)
    /// - OPENAI_MODEL: completion model (default: gpt-4.1-mini)
    /// - MAX_TOKENS: completion token budget (default: 1000)
    /// - VECTOR_BACKEND: lancedb or memory (default: lancedb)
    /// - DEBUG: enable debug logging (default: false)
    ///
    /// Call [`load_dotenv_files`] first so dotenv values are visible here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let bind_addr = match get("BIND_ADDR") {
            Some(addr) => addr.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidVar {
                    name: "BIND_ADDR",
                    value: addr.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let max_tokens = match get("MAX_TOKENS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::InvalidVar {
                name: "MAX_TOKENS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_TOKENS,
        };

        let backend = match get("VECTOR_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => BackendKind::LanceDb,
            Some(kind) if kind == "lancedb" => BackendKind::LanceDb,
            Some(kind) if kind == "memory" => BackendKind::Memory,
            Some(kind) => {
                return Err(ConfigError::InvalidVar {
                    name: "VECTOR_BACKEND",
                    value: kind,
                    reason: "expected 'lancedb' or 'memory'".to_string(),
                });
            }
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            api_password: required("API_PASSWORD")?,
            bind_addr,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("vectorstore")),
            prompts_dir: get("PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("resources/prompts")),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            backend,
            debug: get("DEBUG")
                .map(|d| d.eq_ignore_ascii_case("true") || d == "1")
                .unwrap_or(false),
        })
    }

    /// Vector store settings derived from this configuration
    pub fn vector_store(&self) -> VectorStoreConfig {
        match self.backend {
            BackendKind::LanceDb => VectorStoreConfig::Embedded {
                path: self.data_dir.clone(),
            },
            BackendKind::Memory => VectorStoreConfig::InMemory,
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("api_password", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("prompts_dir", &self.prompts_dir)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("max_tokens", &self.max_tokens)
            .field("backend", &self.backend)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Result of loading one dotenv file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotenvStatus {
    Loaded,
    Missing,
    Failed(String),
}

/// Outcome of a dotenv load, kept until logging is up
#[derive(Debug, Clone)]
pub struct DotenvLoad {
    pub path: PathBuf,
    pub status: DotenvStatus,
}

impl DotenvLoad {
    pub fn log(&self) {
        match &self.status {
            DotenvStatus::Loaded => tracing::debug!(path = %self.path.display(), "Loaded dotenv file"),
            DotenvStatus::Missing => {
                tracing::debug!(path = %self.path.display(), "No dotenv file")
            }
            DotenvStatus::Failed(error) => {
                tracing::warn!(path = %self.path.display(), %error, "Failed to load dotenv file")
            }
        }
    }
}

/// Load every file in [`DOTENV_FILES`] into the process environment
pub fn load_dotenv_files() -> Vec<DotenvLoad> {
    DOTENV_FILES
        .iter()
        .map(|file| load_dotenv(Path::new(file)))
        .collect()
}

pub fn load_dotenv(path: &Path) -> DotenvLoad {
    let status = match dotenvy::from_path(path) {
        Ok(()) => DotenvStatus::Loaded,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            DotenvStatus::Missing
        }
        Err(e) => DotenvStatus::Failed(e.to_string()),
    };
    DotenvLoad {
        path: path.to_path_buf(),
        status,
    }
}
