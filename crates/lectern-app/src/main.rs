mod cli;
mod commands;

use std::process::ExitCode;

use lectern_config::LecternConfig;
use tracing_subscriber::EnvFilter;

fn load_config(args: &cli::Args) -> Result<LecternConfig, lectern_common::ConfigError> {
    match args.config {
        Some(ref path) => {
            tracing::info!("Using config override: {}", path.display());
            lectern_config::load_config_from(path)
        }
        None => lectern_config::load_config(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Config comes first so its log level can seed the filter; anything it
    // logs before the subscriber exists is dropped.
    let config = load_config(&args);
    let default_level = config
        .as_ref()
        .map(|c| c.logging.level.as_directive())
        .unwrap_or("info");
    let filter = match args.log_level {
        Some(ref level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("lectern={default_level}"))),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Lectern v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config load failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(args.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
