use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("source URL is not set")]
    MissingSourceUrl,

    #[error("template path is not set")]
    MissingTemplatePath,

    #[error("token is empty")]
    EmptyToken,

    #[error("fetch timeout cannot be 0")]
    InvalidFetchTimeout,
}

/// Subscription service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener serving `/subscribe`
    #[serde(default)]
    pub listener: Listener,
    /// Optional listener for `/health` and `/ready`
    pub admin_listener: Option<Listener>,
    /// Feed to convert
    ///
    /// Note: Uses the `url::Url` type so invalid URLs are rejected during
    /// config deserialization.
    pub source_url: Option<Url>,
    /// Template rendered for every request
    pub template_path: Option<PathBuf>,
    /// Token callers must present as `?token=`
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: None,
            source_url: None,
            template_path: None,
            token: String::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Checks that everything needed to serve requests is present.
    pub fn validate(&self) -> Result<ValidConfig, ValidationError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }

        let source_url = self
            .source_url
            .clone()
            .ok_or(ValidationError::MissingSourceUrl)?;
        let template_path = self
            .template_path
            .clone()
            .ok_or(ValidationError::MissingTemplatePath)?;

        if self.token.is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ValidationError::InvalidFetchTimeout);
        }

        Ok(ValidConfig {
            listener: self.listener.clone(),
            admin_listener: self.admin_listener.clone(),
            source_url,
            template_path,
            token: self.token.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        })
    }
}

/// Configuration that passed validation; fixed for the process lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidConfig {
    pub listener: Listener,
    pub admin_listener: Option<Listener>,
    pub source_url: Url,
    pub template_path: PathBuf,
    pub token: String,
    pub fetch_timeout: Duration,
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
