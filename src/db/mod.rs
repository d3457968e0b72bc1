//! Database abstraction layer.
//!
//! The query tool only sees the two traits below. [`ConnectionManager`] is the
//! production resolver backed by sqlx pools; tests substitute their own.

pub mod executor;
pub mod pool;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionManager, ConnectionSummary, DbPool, ResolvedConnection};

use crate::error::DbResult;
use crate::models::QueryResult;
use std::future::Future;

/// A connection the query tool can run statements on.
pub trait QueryConnection: Send + Sync {
    /// Prefix for table names on this connection. Empty means none.
    fn table_prefix(&self) -> &str;

    /// Run `sql` and return its rows.
    fn execute(&self, sql: &str) -> impl Future<Output = DbResult<QueryResult>> + Send;
}

/// Looks up connections by name.
pub trait ConnectionResolver: Send + Sync {
    type Connection: QueryConnection;

    /// Resolve `name`, or the default connection when `name` is `None`.
    ///
    /// Fails with `DbError::ConnectionNotFound` for an unknown name.
    fn resolve(
        &self,
        name: Option<&str>,
    ) -> impl Future<Output = DbResult<Self::Connection>> + Send;
}
