//! Read-only query tool.
//!
//! This module implements the `database_query` MCP tool. A request passes
//! through four stages: the leading keyword is checked against the read-only
//! allow-list, the named (or default) connection is resolved, bare table
//! names get the connection's prefix, and the statement runs. Gate
//! rejections never reach a connection.

use crate::db::{ConnectionResolver, QueryConnection};
use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, Row};
use crate::tools::sql_validator;
use crate::tools::table_prefix::apply_table_prefix;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL to run. Only statements starting with SELECT, SHOW, EXPLAIN, DESCRIBE, DESC, VALUES, TABLE or WITH ... SELECT are accepted.
    pub query: String,
    /// Connection name from database_connections. Omit to use the default connection.
    #[serde(default)]
    pub database: Option<String>,
}

impl QueryInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            database: None,
        }
    }

    pub fn on(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Requested connection name; blank counts as omitted.
    fn connection_name(&self) -> Option<&str> {
        self.database
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Result rows as column name to value maps
    pub rows: Vec<Row>,
    /// Number of rows returned
    pub row_count: usize,
    /// True if the result was cut off at the server's row limit
    pub truncated: bool,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
    /// The statement that actually ran, when table prefixing changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            row_count: result.rows.len(),
            rows: result.rows,
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
            rewritten_query: None,
        }
    }
}

/// Handler for the `database_query` tool.
#[derive(Debug)]
pub struct QueryToolHandler<R> {
    resolver: Arc<R>,
}

impl<R> Clone for QueryToolHandler<R> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<R: ConnectionResolver> QueryToolHandler<R> {
    pub fn new(resolver: Arc<R>) -> Self {
        Self { resolver }
    }

    /// Run one query request.
    ///
    /// Gate rejections come back as `InvalidQuery` or `NotReadOnly`; anything
    /// the resolver or the connection raises is wrapped in `ExecutionFailure`.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        let validated = sql_validator::validate_readonly(&input.query)?;
        let database = input.connection_name();

        let connection = self
            .resolver
            .resolve(database)
            .await
            .map_err(|e| DbError::execution_failure(e.detail()))?;

        let sql = apply_table_prefix(validated, connection.table_prefix());

        let result = connection
            .execute(&sql)
            .await
            .map_err(|e| DbError::execution_failure(e.detail()))?;

        info!(
            database = database.unwrap_or("default"),
            row_count = result.rows.len(),
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        let mut output = QueryOutput::from(result);
        if let Cow::Owned(rewritten) = sql {
            output.rewritten_query = Some(rewritten);
        }
        Ok(output)
    }

    /// Run one query request and always produce a tool result.
    pub async fn call(&self, input: QueryInput) -> CallToolResult {
        match self.query(input).await {
            Ok(output) => match Content::json(&output) {
                Ok(content) => CallToolResult::success(vec![content]),
                Err(e) => DbError::internal(format!("Failed to serialize rows: {}", e.message))
                    .into_tool_result(),
            },
            Err(e) => {
                if !e.is_rejection() {
                    warn!(error = %e, "Query failed");
                }
                e.into_tool_result()
            }
        }
    }
}
