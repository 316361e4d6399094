#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod routes;
mod server;

use std::process;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "helmet_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "helmet_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "helmet_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing();

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting helmet server"
    );

    cli.log();
    let policy = cli.load()?;
    let router = routes::create_router(policy);

    if let Err(error) = server::serve(router, cli.server).await {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            code = error.error_code(),
            suggestion = error.suggestion(),
            "server failed"
        );
        return Err(error.into());
    }

    Ok(())
}
