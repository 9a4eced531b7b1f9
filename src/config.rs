//! Configuration module for hookrelay.
//!
//! Loads configuration from a TOML file with environment variable
//! substitution.
//!
//! # Example
//!
//! ```toml
//! topic = "metadata_webhook_gitcode"
//! user_agent = "robot-1"
//!
//! [broker]
//! url = "${REDIS_URL}"
//! max_len = 100000
//! ```

use axum::http::HeaderValue;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("{0}")]
    ValidationError(String),
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Broker topic every webhook is published to
    #[serde(default)]
    pub topic: String,

    /// User-Agent written into published headers
    #[serde(default)]
    pub user_agent: String,

    #[serde(default)]
    pub broker: BrokerConfig,
}

/// Broker (Redis) configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Approximate upper bound on stream length (`XADD MAXLEN ~`)
    #[serde(default)]
    pub max_len: Option<usize>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            max_len: None,
        }
    }
}

fn default_broker_url() -> String {
    "redis://localhost:6379".to_string()
}

impl BrokerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        const SCHEMES: [&str; 4] = ["redis://", "rediss://", "unix://", "redis+unix://"];

        let valid = SCHEMES
            .iter()
            .any(|scheme| self.url.len() > scheme.len() && self.url.starts_with(scheme));
        if !valid {
            return Err(ConfigError::ValidationError("invalid mq address".to_string()));
        }

        if self.max_len == Some(0) {
            return Err(ConfigError::ValidationError(
                "broker max_len must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl RelayConfig {
    /// Load configuration from a specific path.
    ///
    /// Unlike optional config files, a missing file is an error: the topic
    /// and identity have no sensible defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let content = substitute_env_vars(content);

        debug!("Parsing TOML configuration");
        let config: RelayConfig = toml::from_str(&content)?;

        config.validate()?;

        info!(
            topic = %config.topic,
            user_agent = %config.user_agent,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.is_empty() {
            return Err(ConfigError::ValidationError("missing topic".to_string()));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::ValidationError("missing user_agent".to_string()));
        }

        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::ValidationError(
                "user_agent is not a valid header value".to_string(),
            ));
        }

        self.broker.validate()
    }

    /// The configured identity as a header value.
    pub fn user_agent_header(&self) -> Result<HeaderValue, ConfigError> {
        HeaderValue::from_str(&self.user_agent).map_err(|_| {
            ConfigError::ValidationError("user_agent is not a valid header value".to_string())
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(content: &str) -> String {
    let re = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, keeping placeholder");
                caps[0].to_string()
            }
        }
    })
    .to_string()
}
