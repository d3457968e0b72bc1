//! Error types for the devtools MCP server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! The query gate's own failures (`InvalidQuery`, `NotReadOnly`) never reach a database;
//! everything raised by a connection is surfaced to the caller as `ExecutionFailure`.

use rmcp::model::{CallToolResult, Content};
use std::borrow::Cow;
use thiserror::Error;

/// Message returned when the caller supplies no executable SQL.
pub const INVALID_QUERY_MESSAGE: &str = "Please pass a valid query";

/// Message returned when the leading keyword is not on the read-only allow-list.
pub const NOT_READ_ONLY_MESSAGE: &str =
    "Only read-only queries are allowed (SELECT, SHOW, EXPLAIN, DESCRIBE, DESC, WITH … SELECT).";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{}", INVALID_QUERY_MESSAGE)]
    InvalidQuery,

    #[error("{}", NOT_READ_ONLY_MESSAGE)]
    NotReadOnly {
        /// Leading keyword as written by the caller
        keyword: String,
    },

    #[error("Query failed: {message}")]
    ExecutionFailure { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Connection not found: {connection}")]
    ConnectionNotFound { connection: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a not-read-only error for the given leading keyword.
    pub fn not_read_only(keyword: impl Into<String>) -> Self {
        Self::NotReadOnly {
            keyword: keyword.into(),
        }
    }

    /// Wrap a collaborator failure so its message reaches the caller verbatim.
    pub fn execution_failure(message: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn connection_not_found(connection: impl Into<String>) -> Self {
        Self::ConnectionNotFound {
            connection: connection.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// The message without the variant's display label, as a backend or
    /// collaborator reported it. Variants with no separate message fall back
    /// to their display text.
    pub fn detail(&self) -> Cow<'_, str> {
        match self {
            Self::ExecutionFailure { message }
            | Self::Connection { message, .. }
            | Self::Database { message, .. }
            | Self::InvalidInput { message }
            | Self::Internal { message } => Cow::Borrowed(message),
            _ => Cow::Owned(self.to_string()),
        }
    }

    /// True for the gate's own rejections, which never touch a connection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidQuery | Self::NotReadOnly { .. })
    }

    /// Convert into an MCP tool result flagged as an error.
    ///
    /// Tool failures are reported inside a successful JSON-RPC response so the
    /// calling agent sees the message instead of a protocol fault.
    pub fn into_tool_result(self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.to_string())])
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for the rare cases that must fail at protocol level.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidQuery | DbError::NotReadOnly { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), None)
            }
            DbError::ConnectionNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), None)
            }
            DbError::Database { message, sql_state } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, None)
            }
            DbError::Connection { .. }
            | DbError::Timeout { .. }
            | DbError::ExecutionFailure { .. }
            | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
