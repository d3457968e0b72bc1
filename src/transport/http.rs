//! Streamable HTTP transport for the MCP server.

use crate::auth::{AuthConfig, auth_middleware};
use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::mcp::DevToolsService;
use crate::transport::{Transport, wait_for_signal};
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// How long open SSE streams may keep the server alive after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    connection_manager: Arc<ConnectionManager>,
    host: String,
    port: u16,
    endpoint: String,
    auth: Arc<AuthConfig>,
}

impl HttpTransport {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            connection_manager,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
            auth: Arc::new(auth),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the axum router serving MCP at the configured endpoint.
    pub fn router(&self) -> Router {
        let connection_manager = Arc::clone(&self.connection_manager);
        let service = StreamableHttpService::new(
            move || Ok(DevToolsService::new(Arc::clone(&connection_manager))),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service rejects "/", so the root endpoint uses the fallback
        let router = if self.endpoint == "/" {
            Router::new().fallback_service(service)
        } else {
            Router::new().nest_service(&self.endpoint, service)
        };

        if self.auth.is_enabled() {
            router.layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.auth),
                auth_middleware,
            ))
        } else {
            router
        }
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!(
            bind_addr = %bind_addr,
            auth = self.auth.is_enabled(),
            "Starting MCP server with HTTP transport"
        );
        if !self.auth.is_enabled() {
            warn!("HTTP transport running without authentication");
        }

        let app = self.router();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let notify = Arc::clone(&shutdown_notify);
        let shutdown_signal = async move {
            wait_for_signal().await;
            notify.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        self.connection_manager.close_all().await;
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing database connections");
        self.connection_manager.close_all().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str, auth: AuthConfig) -> HttpTransport {
        HttpTransport::new(
            Arc::new(ConnectionManager::default()),
            "127.0.0.1",
            8080,
            endpoint,
            auth,
        )
    }

    #[test]
    fn test_http_transport_creation() {
        let transport = transport("/mcp", AuthConfig::default());
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "127.0.0.1:8080");
        assert_eq!(transport.endpoint(), "/mcp");
    }

    #[tokio::test]
    async fn test_router_builds_for_root_and_nested_endpoints() {
        let auth = AuthConfig::from_tokens(vec!["token".to_string()]).unwrap();
        let _ = transport("/", AuthConfig::default()).router();
        let _ = transport("/api/mcp", auth).router();
    }
}
