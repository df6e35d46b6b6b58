use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::services::openrouter::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    /// In-memory storage when unset.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Reads the process environment (call `dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            openrouter_api_key: var("OPENROUTER_API_KEY")
                .context("OPENROUTER_API_KEY must be set in .env file")?,
            openrouter_model: var("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openrouter_base_url: var("OPENROUTER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            api_token: var("API_TOKEN"),
            static_dir: var("STATIC_DIR").map(PathBuf::from),
        })
    }
}
