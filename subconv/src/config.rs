use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use subscription::config::{Config as SubscriptionConfig, Listener};
use url::Url;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive, `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

fn default_level() -> String {
    "info".into()
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub link: Option<String>,
    pub address: Option<String>,
    pub tpl: Option<PathBuf>,
    pub token: Option<String>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        let subscription = &mut self.subscription;

        if let Some(link) = overrides.link {
            let url = Url::parse(&link).map_err(|e| ConfigError::InvalidUrl(link, e))?;
            subscription.source_url = Some(url);
        }
        if let Some(address) = overrides.address {
            subscription.listener = parse_address(&address)?;
        }
        if let Some(tpl) = overrides.tpl {
            subscription.template_path = Some(tpl);
        }
        if let Some(token) = overrides.token {
            subscription.token = token;
        }

        Ok(())
    }
}

/// Parses `host:port`. An empty host, as in `:8080`, binds every interface.
fn parse_address(address: &str) -> Result<Listener, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(address.to_string());

    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = match host {
        "" => "0.0.0.0",
        host => host,
    };

    Ok(Listener {
        host: host.to_string(),
        port,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid source URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("invalid listen address {0:?}, expected host:port")]
    InvalidAddress(String),
}
