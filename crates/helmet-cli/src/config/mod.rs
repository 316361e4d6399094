//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig   # Host, port, shutdown
//! └── policy: PolicyArgs     # CSP and X-Frame-Options
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! helmet-cli --policy-file policy.json --development --port 8080
//!
//! POLICY_FILE=policy.json CSP_REPORT_ONLY=true helmet-cli
//! ```

mod server;

use std::process;

use anyhow::Context;
use clap::Parser;
use helmet_server::{PolicyArgs, SecurityPolicyConfig};
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "helmet")]
#[command(about = "Serves a demo site behind the security policy middleware")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Security policy configuration.
    #[clap(flatten)]
    pub policy: PolicyArgs,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates the server configuration and resolves the security policy.
    pub fn load(&self) -> anyhow::Result<SecurityPolicyConfig> {
        self.server
            .validate()
            .context("invalid server configuration")?;

        let policy = self
            .policy
            .load()
            .context("invalid security policy configuration")?;

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            csp = %policy.csp,
            report_only = policy.csp.is_report_only(),
            frame_options = %policy.frame_options,
            development = policy.development,
            "Security policy configuration"
        );

        Ok(policy)
    }

    /// Logs configuration at startup.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.server.log();
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_arguments() {
        let cli = Cli::try_parse_from([
            "helmet",
            "--port",
            "8080",
            "--development",
            "--csp-report-only",
            "--frame-options",
            "SAMEORIGIN",
            "--csp-nonce",
            "script-src,style-src",
        ])
        .unwrap();

        let policy = cli.load().unwrap();
        assert_eq!(cli.server.port, 8080);
        assert!(policy.development);
        assert!(policy.csp.is_report_only());
        assert_eq!(policy.frame_options.serialize(), "SAMEORIGIN");
        assert_eq!(policy.nonce_directives.len(), 2);
    }

    #[test]
    fn rejects_unknown_frame_options() {
        assert!(Cli::try_parse_from(["helmet", "--frame-options", "ALLOWALL"]).is_err());
    }
}
