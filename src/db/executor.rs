//! Query execution engine.
//!
//! Statements run as raw SQL through the pool's `Executor::fetch`, never as
//! prepared statements, so MySQL `SHOW` and `DESCRIBE` work. Results are
//! streamed and at most `row_limit + 1` rows are pulled from the server; the
//! extra row only tells us whether the result was truncated.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryResult};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs read queries against a pool with a row limit and a timeout.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
    row_limit: u32,
}

/// Expands to the same streaming fetch for each concrete pool type.
macro_rules! fetch_limited {
    ($pool:expr, $sql:expr, $fetch_limit:expr, $query_timeout:expr) => {{
        use sqlx::Executor;
        let rows = $pool.fetch($sql).take($fetch_limit).collect::<Vec<_>>();
        match timeout($query_timeout, rows).await {
            Ok(results) => results
                .into_iter()
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(DbError::from),
            Err(_) => Err(DbError::timeout(
                "query execution",
                $query_timeout.as_secs(),
            )),
        }
    }};
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create an executor with custom limits. The row limit is clamped to
    /// `1..=MAX_ROW_LIMIT`.
    pub fn with_limits(timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            query_timeout: Duration::from_secs(timeout_secs.max(1)),
            row_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute `sql` and return its rows as JSON objects.
    pub async fn execute(&self, pool: &DbPool, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        let fetch_limit = self.row_limit as usize + 1;

        debug!(
            sql = %sql,
            limit = self.row_limit,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let rows = match pool {
            DbPool::MySql(p) => to_json_rows(fetch_limited!(p, sql, fetch_limit, self.query_timeout)?),
            DbPool::Postgres(p) => {
                to_json_rows(fetch_limited!(p, sql, fetch_limit, self.query_timeout)?)
            }
            DbPool::SQLite(p) => to_json_rows(fetch_limited!(p, sql, fetch_limit, self.query_timeout)?),
        };

        Ok(self.finish(rows, start))
    }

    fn finish(&self, mut rows: Vec<crate::models::Row>, start: Instant) -> QueryResult {
        let truncated = rows.len() > self.row_limit as usize;
        if truncated {
            rows.truncate(self.row_limit as usize);
            warn!(limit = self.row_limit, "Query result truncated");
        }

        QueryResult {
            rows,
            truncated,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn to_json_rows<R: RowToJson>(rows: Vec<R>) -> Vec<crate::models::Row> {
    rows.iter().map(RowToJson::to_json_row).collect()
}
