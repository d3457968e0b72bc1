//! Data models for the devtools MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType};
pub use query::{DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult, Row};
