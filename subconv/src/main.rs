mod config;
mod logging;
mod statsd;

use clap::{Args, Parser};
use config::{Config, Overrides};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "Converts a subscription feed through a template")]
enum CliCommand {
    /// Serve the /subscribe endpoint
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// YAML config file; flags below take precedence over it
    #[arg(long)]
    config_file_path: Option<PathBuf>,
    /// Subscription feed URL
    #[arg(long, env = "SUBCONV_LINK")]
    link: Option<String>,
    /// Listen address, e.g. ":8080" or "127.0.0.1:8080"
    #[arg(long, env = "SUBCONV_ADDRESS")]
    address: Option<String>,
    /// Template path
    #[arg(long, env = "SUBCONV_TPL")]
    tpl: Option<PathBuf>,
    /// Token callers must pass as ?token=
    #[arg(long, env = "SUBCONV_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    match cli {
        CliCommand::Serve(args) => serve(args),
    }
}

fn load_config(args: ServeArgs) -> Result<Config, config::ConfigError> {
    let mut config = match &args.config_file_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    config.apply(Overrides {
        link: args.link,
        address: args.address,
        tpl: args.tpl,
        token: args.token,
    })?;

    Ok(config)
}

fn serve(args: ServeArgs) -> ExitCode {
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = logging::init(config.common.logging.as_ref());

    if let Some(metrics_config) = &config.common.metrics
        && let Err(e) = statsd::init(metrics_config)
    {
        tracing::error!("Failed to set up metrics: {e}");
        return ExitCode::FAILURE;
    }

    let subscription_config = match config.subscription.validate() {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!("Refusing to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(subscription::run(subscription_config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Subscription service error: {e}");
            ExitCode::FAILURE
        }
    }
}
