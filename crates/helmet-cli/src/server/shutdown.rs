//! Shutdown signals and the bounded connection drain.

use std::fmt;
use std::future::{Future, pending};
use std::io;
use std::time::Duration;

use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;

use super::{Result, ServerError};
use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Signal that started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CtrlC => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolves on the first SIGTERM or Ctrl+C.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn wait_for_signal() -> ShutdownSignal {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => ShutdownSignal::CtrlC,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %error,
                    "failed to install Ctrl+C handler"
                );
                pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                ShutdownSignal::Terminate
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    error = %error,
                    "failed to install SIGTERM handler"
                );
                pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<ShutdownSignal>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}

/// Waits for in-flight connections to finish, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`ServerError::ShutdownTimeout`] if the drain outlives `timeout`
/// and [`ServerError::Runtime`] if the server fails while draining.
pub async fn drain<F>(server: F, timeout: Duration) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    match tokio::time::timeout(timeout, server).await {
        Ok(result) => result.map_err(ServerError::Runtime),
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = timeout.as_secs(),
                "connections still open after shutdown timeout, closing them"
            );
            Err(ServerError::ShutdownTimeout(timeout))
        }
    }
}
