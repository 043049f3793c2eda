use std::{env, path::PathBuf};

use thiserror::Error;

use crate::history::MAX_HISTORY_SIZE;

pub const DEFAULT_PROMPT: &str = "osh-> ";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("OSH_HISTORY_SIZE must be a whole number of at least 1, got `{0}`")]
    InvalidHistorySize(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub history_size: usize,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.into(),
            history_size: MAX_HISTORY_SIZE,
            log_dir: None,
        }
    }
}

impl Config {
    /// Reads `OSH_PROMPT`, `OSH_HISTORY_SIZE` and `OSH_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prompt) = lookup("OSH_PROMPT") {
            config.prompt = prompt;
        }

        if let Some(size) = lookup("OSH_HISTORY_SIZE") {
            config.history_size = size
                .trim()
                .parse()
                .ok()
                .filter(|size| *size >= 1)
                .ok_or(ConfigError::InvalidHistorySize(size))?;
        }

        config.log_dir = lookup("OSH_LOG_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}
