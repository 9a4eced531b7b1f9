//! Command-line options and secret loading.

use clap::Parser;
use secrecy::ExposeSecret;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::Secret;

/// Errors raised while validating options or loading the secret.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid handle path '{0}'")]
    InvalidHandlePath(String),

    #[error("failed to read secret file {path}: {source}")]
    ReadSecret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret file {0} is empty")]
    EmptySecret(PathBuf),

    #[error("failed to delete secret file {path}: {source}")]
    DeleteSecret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Relay signed webhooks onto a Redis stream.
#[derive(Debug, Clone, Parser)]
#[command(name = "hookrelay", version, about)]
pub struct Options {
    /// Port to listen on
    #[arg(long, env = "HOOKRELAY_PORT", default_value_t = 8888)]
    pub port: u16,

    /// Path to the TOML configuration file
    #[arg(long, env = "HOOKRELAY_CONFIG")]
    pub config_file: PathBuf,

    /// URL path segment that receives webhooks
    #[arg(long, default_value = "gitcode-hook")]
    pub handle_path: String,

    /// Path to the file containing the HMAC secret
    #[arg(long)]
    pub hmac_secret_file: PathBuf,

    /// Delete the HMAC secret file once it has been read
    #[arg(
        long = "del-secret",
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub del_secret: bool,

    /// Enable debug logging
    #[arg(
        long,
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub enable_debug: bool,
}

impl Options {
    /// The handle path without leading slashes, validated for use as a
    /// single static route.
    pub fn handle_path(&self) -> Result<&str, OptionsError> {
        let path = self.handle_path.trim_start_matches('/');

        let invalid = path.is_empty()
            || path
                .chars()
                .any(|c| matches!(c, ':' | '*' | '{' | '}' | '?' | '#') || c.is_whitespace());
        if invalid {
            return Err(OptionsError::InvalidHandlePath(self.handle_path.clone()));
        }

        Ok(path)
    }

    /// Read the HMAC secret, deleting the file afterwards if requested.
    pub fn load_secret(&self) -> Result<Secret, OptionsError> {
        let secret = load_secret(&self.hmac_secret_file)?;

        if self.del_secret {
            fs::remove_file(&self.hmac_secret_file).map_err(|source| {
                OptionsError::DeleteSecret {
                    path: self.hmac_secret_file.clone(),
                    source,
                }
            })?;
            info!(path = %self.hmac_secret_file.display(), "Deleted HMAC secret file");
        }

        Ok(secret)
    }
}

/// Read a secret file, trimming surrounding whitespace.
pub fn load_secret(path: &Path) -> Result<Secret, OptionsError> {
    let raw = Secret::from(fs::read(path).map_err(|source| OptionsError::ReadSecret {
        path: path.to_path_buf(),
        source,
    })?);

    let secret = Secret::from(raw.expose_secret().trim_ascii().to_vec());
    if secret.expose_secret().is_empty() {
        return Err(OptionsError::EmptySecret(path.to_path_buf()));
    }

    debug!(path = %path.display(), "Loaded HMAC secret");
    Ok(secret)
}
