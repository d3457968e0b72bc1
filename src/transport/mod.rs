//! Transport layer for the MCP server.
//!
//! - Stdio: JSON-RPC over stdin/stdout, the usual mode for agent integrations
//! - HTTP: rmcp streamable HTTP served by axum

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::DbResult;
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// An MCP transport that serves until shutdown.
pub trait Transport: Send + Sync {
    /// Serve requests until the client disconnects or a shutdown signal arrives.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    fn name(&self) -> &'static str;
}

/// Wait for SIGINT or SIGTERM.
///
/// If a handler cannot be installed that branch never resolves, so the
/// other signal still works.
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
