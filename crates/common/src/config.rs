//! Configuration management following 12-factor app principles
//!
//! Runtime configuration is loaded from environment variables (and an
//! optional `.env` file) so the core stays free of ambient global state.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default Gemini REST endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default completion provider
pub const DEFAULT_LLM_PROVIDER: &str = "gemini";

/// Default tracing filter
pub const DEFAULT_RUST_LOG: &str = "gemchat=info";

/// Name of the settings file inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Completion provider (gemini, mock)
    pub llm_provider: String,

    /// Base URL of the generative-language REST API
    pub api_base_url: String,

    /// Directory holding the persisted settings file
    pub data_dir: PathBuf,

    /// Optional cap on messages kept per conversation
    pub max_history: Option<usize>,

    /// Tracing filter directive
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_history = match lookup("GEMCHAT_MAX_HISTORY") {
            Some(raw) if !raw.trim().is_empty() => {
                let cap: usize = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("GEMCHAT_MAX_HISTORY must be a positive integer, got {raw:?}")
                })?;
                if cap == 0 {
                    anyhow::bail!("GEMCHAT_MAX_HISTORY must be at least 1");
                }
                Some(cap)
            }
            _ => None,
        };

        let data_dir = lookup("GEMCHAT_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            llm_provider: lookup("GEMCHAT_LLM_PROVIDER")
                .unwrap_or_else(|| DEFAULT_LLM_PROVIDER.to_string()),
            api_base_url: lookup("GEMCHAT_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            data_dir,
            max_history,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.to_string()),
        })
    }

    /// Path of the persisted settings file
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }
}

/// Platform config directory, or `.gemchat` when none can be determined
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("org", "gemchat", "gemchat")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".gemchat"))
}
