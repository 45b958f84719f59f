//! Configuration management for hanspell
//!
//! Handles loading and parsing of the `hanspell.toml` configuration file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunker::DEFAULT_MAX_WORDS;
use crate::client::Backend;
use crate::terms::TermStore;

/// Environment variable overriding the service endpoint
pub const ENDPOINT_ENV: &str = "HANSPELL_ENDPOINT";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Spell-check service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pipeline settings
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Protected-term storage
    #[serde(default)]
    pub terms: TermsConfig,
}

/// Spell-check service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service revision: "nara", "pusan" or "json"
    #[serde(default)]
    pub backend: Backend,

    /// Endpoint URL (defaults per backend)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Next-Action header for the nara backend
    #[serde(default)]
    pub action_id: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: None,
            action_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Endpoint from the environment, the config file, or the backend default
    pub fn effective_endpoint(&self) -> Option<String> {
        if let Ok(url) = std::env::var(ENDPOINT_ENV) {
            if !url.trim().is_empty() {
                return Some(url.trim().to_string());
            }
        }

        if let Some(ref url) = self.endpoint {
            if !url.is_empty() {
                return Some(url.clone());
            }
        }

        self.backend.default_endpoint().map(str::to_string)
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Maximum words sent in one request
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

/// Protected-term storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TermsConfig {
    /// Term file location (defaults to the user data directory)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_words() -> usize {
    DEFAULT_MAX_WORDS
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hanspell").map(|dirs| dirs.config_dir().join("hanspell.toml"))
    }

    /// Load configuration from the working directory or the user config directory
    pub fn load_from_default() -> Self {
        let workspace_path = PathBuf::from("hanspell.toml");
        if workspace_path.exists() {
            match Self::load(&workspace_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {}", workspace_path.display(), e),
            }
        }

        if let Some(default_path) = Self::default_path() {
            match Self::load(&default_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {}", default_path.display(), e),
            }
        }

        Config::default()
    }

    /// Term store at the configured or default location
    pub fn term_store(&self) -> Option<TermStore> {
        self.terms
            .path
            .clone()
            .or_else(TermStore::default_path)
            .map(TermStore::new)
    }
}
