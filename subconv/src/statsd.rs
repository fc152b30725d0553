use crate::config::MetricsConfig;
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

const METRICS_PREFIX: &str = "subconv";

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Sends every metric recorded through the `metrics` facade to statsd.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;

    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Reporting metrics to statsd"
    );

    Ok(())
}
