//! MCP service implementation using rmcp.
//!
//! This module defines the DevToolsService struct with the database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::{ConnectionManager, ConnectionSummary};
use crate::tools::query::{QueryInput, QueryToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use std::sync::Arc;

/// Output for the database_connections tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListConnectionsOutput {
    pub connections: Vec<ConnectionSummary>,
    /// Connection used when `database` is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub count: usize,
}

#[derive(Clone)]
pub struct DevToolsService {
    connection_manager: Arc<ConnectionManager>,
    query_handler: QueryToolHandler<ConnectionManager>,
    tool_router: ToolRouter<Self>,
}

impl DevToolsService {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            query_handler: QueryToolHandler::new(Arc::clone(&connection_manager)),
            connection_manager,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl DevToolsService {
    #[tool(
        description = "List the configured database connections.\nReturns each connection name, type (MySQL/PostgreSQL/SQLite), table prefix, and which one is the default."
    )]
    async fn database_connections(&self) -> Json<ListConnectionsOutput> {
        let connections = self.connection_manager.list_connections_detail().await;
        let default = self.connection_manager.default_connection().await;
        Json(ListConnectionsOutput {
            count: connections.len(),
            connections,
            default,
        })
    }

    #[tool(
        description = "Run a read-only SQL query and return the rows as JSON.\nOnly SELECT, SHOW, EXPLAIN, DESCRIBE, DESC, VALUES, TABLE and WITH ... SELECT statements are accepted.\nOn connections with a table prefix, bare table names are prefixed automatically (`FROM users` runs as `FROM wp_users`).\nOmit `database` to use the default connection."
    )]
    async fn database_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.query_handler.call(input).await)
    }
}

#[tool_handler]
impl ServerHandler for DevToolsService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "devtools-mcp-server".to_owned(),
                title: Some("DevTools MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to the application's SQL databases.\n\
                \n\
                ## Workflow\n\
                1. Call `database_connections` to see connection names and table prefixes\n\
                2. Call `database_query` with `query` and, optionally, `database`\n\
                \n\
                ## Table prefixes\n\
                Write bare table names. On a prefixed connection `SELECT * FROM users`\n\
                runs as `SELECT * FROM wp_users`; names that already carry the prefix\n\
                and CTE names are left alone.\n\
                \n\
                ## Limits\n\
                Writes and DDL are rejected. Large results are truncated (`truncated: true`)."
                    .to_string(),
            ),
        }
    }
}
