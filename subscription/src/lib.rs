pub mod batch;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod feed;
pub mod metrics_defs;
pub mod parser;
pub mod render;
pub mod service;

#[cfg(test)]
mod testutils;

use config::ValidConfig;
use errors::ServerError;
use feed::HttpFeedSource;
use render::TemplateFileRenderer;
use service::{SubscribeService, Subscription};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use shared::metrics_defs::describe_all;
use std::sync::Arc;

pub use descriptor::ServerDescriptor;
pub use parser::parse_line;

/// Serves `/subscribe`, plus `/health` and `/ready` when an admin listener is configured.
pub async fn run(config: ValidConfig) -> Result<(), ServerError> {
    let feed = HttpFeedSource::new(config.source_url.clone(), config.fetch_timeout)?;
    let renderer = TemplateFileRenderer::new(config.template_path);
    let template_path = renderer.path().to_path_buf();
    let subscription = Subscription::new(config.token, Arc::new(feed), Arc::new(renderer));

    describe_all(metrics_defs::ALL_METRICS);
    tracing::info!(
        source = %config.source_url,
        template = %template_path.display(),
        "Starting subscription service"
    );

    let subscribe_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        SubscribeService::new(subscription),
    );

    match config.admin_listener {
        Some(admin) => {
            let admin_service =
                AdminService::<_, ServerError>::new(move || template_path.exists());
            let admin_task = run_http_service(&admin.host, admin.port, admin_service);
            tokio::try_join!(subscribe_task, admin_task)?;
        }
        None => subscribe_task.await?,
    }

    Ok(())
}
