use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod bridge;
mod commands;
mod config;
mod models;
mod services;
mod utils;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // stdout is the result channel, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ftsend=debug,reqwest=warn,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting ftsend v{}", env!("CARGO_PKG_VERSION"));

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    match commands::run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
