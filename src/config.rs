//! TOML configuration.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:8000"
//! timeout_secs = 30
//!
//! [defaults]
//! sample_subject = "sample"
//! files_subject = "me"
//! urls_subject = "me"
//! chat_subject = "sample"
//! facts_subject = "sample"
//! ```
//!
//! Every key has a default, so an empty file (or [`Config::minimal`]) is a
//! working configuration pointed at a local backend.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub defaults: SubjectDefaults,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Subject id used by each form when its subject input is left empty.
#[derive(Debug, Deserialize, Clone)]
pub struct SubjectDefaults {
    #[serde(default = "default_sample_subject")]
    pub sample_subject: String,
    #[serde(default = "default_files_subject")]
    pub files_subject: String,
    #[serde(default = "default_files_subject")]
    pub urls_subject: String,
    #[serde(default = "default_sample_subject")]
    pub chat_subject: String,
    #[serde(default = "default_sample_subject")]
    pub facts_subject: String,
}

impl Default for SubjectDefaults {
    fn default() -> Self {
        Self {
            sample_subject: default_sample_subject(),
            files_subject: default_files_subject(),
            urls_subject: default_files_subject(),
            chat_subject: default_sample_subject(),
            facts_subject: default_sample_subject(),
        }
    }
}

fn default_sample_subject() -> String {
    "sample".to_string()
}
fn default_files_subject() -> String {
    "me".to_string()
}

impl Config {
    /// Configuration used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Returns a copy pointed at a different backend.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.server.base_url = base_url.into();
        self
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let base = config.server.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        anyhow::bail!(
            "server.base_url must start with http:// or https:// (got '{}')",
            config.server.base_url
        );
    }

    if config.server.timeout_secs == 0 {
        anyhow::bail!("server.timeout_secs must be > 0");
    }

    let d = &config.defaults;
    for (key, value) in [
        ("defaults.sample_subject", &d.sample_subject),
        ("defaults.files_subject", &d.files_subject),
        ("defaults.urls_subject", &d.urls_subject),
        ("defaults.chat_subject", &d.chat_subject),
        ("defaults.facts_subject", &d.facts_subject),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("{} must not be empty", key);
        }
    }

    Ok(())
}
