use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::DatalensError;

/// Default analysis API root, matching the backend's development server.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatalensConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Transport timeout in seconds; `0` leaves requests unbounded.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Delay between attempts to attach to the identity provider.
    pub init_retry_ms: u64,
    /// `None` keeps retrying for the lifetime of the process.
    pub max_init_attempts: Option<usize>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            init_retry_ms: 500,
            max_init_attempts: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub fallback_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: "Sorry, I couldn't reach the server.".to_string(),
        }
    }
}

impl DatalensConfig {
    /// Load from an optional TOML file, then apply `DATALENS__SECTION__KEY`
    /// environment overrides.
    pub fn load(path: &str) -> Result<Self, DatalensError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("DATALENS").prefix_separator("__").separator("__"))
            .build()?;
        Ok(s.try_deserialize()?)
    }
}
