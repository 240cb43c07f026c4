//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;
use crate::scenario::{Backoff, RetryPolicy};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Retry settings applied to scenarios without their own policy
    #[serde(default)]
    pub retry: RetryConfig,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Timeout applied to every request unless a step sets its own
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("restprobe/{}", env!("CARGO_PKG_VERSION"))
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Base URL exposed to scenarios as the `base_url` variable
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.restful-api.dev".to_string()
}

/// Retry settings
#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    /// Retries after a transport failure (0 disables retrying)
    #[serde(default)]
    pub max_retries: u32,

    /// Backoff strategy between attempts
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Delay before the first retry
    #[serde(default = "default_delay")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffKind::default(),
            delay_ms: default_delay(),
        }
    }
}

fn default_delay() -> u64 {
    500
}

/// Backoff strategy name as written in the config file
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl RetryConfig {
    /// Retry policy to use as a scenario default, if retries are enabled
    pub fn policy(&self) -> Option<RetryPolicy> {
        if self.max_retries == 0 {
            return None;
        }
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed {
                delay_ms: self.delay_ms,
            },
            BackoffKind::Exponential => Backoff::Exponential {
                base_ms: self.delay_ms,
            },
        };
        Some(RetryPolicy {
            max_retries: self.max_retries,
            backoff,
        })
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
