//! Stdio transport for the MCP server.

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::mcp::DevToolsService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport {
    connection_manager: Arc<ConnectionManager>,
}

impl StdioTransport {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DevToolsService::new(Arc::clone(&self.connection_manager));
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.connection_manager.close_all().await;
                    return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                }
                info!("Client disconnected");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing all database connections");
        self.connection_manager.close_all().await;

        if shutdown_requested {
            // The stdin reader may still be blocked; select! cannot interrupt it
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_transport_name() {
        let transport = StdioTransport::new(Arc::new(ConnectionManager::default()));
        assert_eq!(transport.name(), "stdio");
    }
}
