use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::clients::orchestrator::{MissingFieldPolicy, OrchestratorOptions};

pub const BASE_URL_ENV: &str = "API_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Prefix for every backend request. Not validated.
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub missing_field: MissingFieldPolicy,
    #[serde(default)]
    pub fencing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            listen_port: default_listen_port(),
            request_timeout_secs: None,
            missing_field: MissingFieldPolicy::default(),
            fencing: false,
        }
    }
}

fn default_listen_port() -> u16 {
    3000
}

impl Config {
    /// Reads `path` if it exists, then applies the `API_BASE_URL` override.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = if path.exists() {
            let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            Self::parse(&data)?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            cfg.api_base_url = url;
        }

        Ok(cfg)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as null
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            missing_field: self.missing_field,
            fencing: self.fencing,
        }
    }
}
