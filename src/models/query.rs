//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default maximum number of rows returned by one query.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Upper bound for the configurable row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// Rows produced by a connection for one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// True if more rows were available than the row limit allowed
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            truncated: false,
            execution_time_ms: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl From<Vec<Row>> for QueryResult {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}
