//! Connection-related data models.
//!
//! This module defines types for database connection configuration.

use crate::config::PoolOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuration for a database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    pub db_type: DatabaseType,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    /// Prepended to bare table names before a query runs. Empty disables rewriting.
    #[serde(default)]
    pub table_prefix: String,
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl ConnectionConfig {
    /// Create a new connection configuration.
    pub fn new(
        id: impl Into<String>,
        connection_string: impl Into<String>,
        table_prefix: impl Into<String>,
        pool_options: PoolOptions,
    ) -> Result<Self, ConnectionConfigError> {
        let id = id.into();
        let connection_string = connection_string.into();
        let table_prefix = table_prefix.into();

        if id.is_empty() {
            return Err(ConnectionConfigError::EmptyId);
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConnectionConfigError::InvalidId(id));
        }
        if !table_prefix
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(ConnectionConfigError::InvalidPrefix(table_prefix));
        }

        let db_type = DatabaseType::from_connection_string(&connection_string)
            .ok_or_else(|| ConnectionConfigError::UnknownDatabaseType(connection_string.clone()))?;

        Ok(Self {
            id,
            db_type,
            connection_string,
            table_prefix,
            pool_options,
        })
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        if let Some(at_pos) = self.connection_string.find('@') {
            if let Some(colon_pos) = self.connection_string[..at_pos].rfind(':') {
                let prefix = &self.connection_string[..colon_pos + 1];
                let suffix = &self.connection_string[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        self.connection_string.clone()
    }
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection ID cannot be empty")]
    EmptyId,

    #[error("Connection ID contains invalid characters: {0}")]
    InvalidId(String),

    /// Prefixes are spliced into SQL, so only identifier characters are accepted
    #[error("Table prefix contains invalid characters: {0}")]
    InvalidPrefix(String),

    #[error("Unknown database type in connection string: {0}")]
    UnknownDatabaseType(String),
}
