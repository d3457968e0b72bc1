//! MCP tool implementations.
//!
//! - `query`: the `database_query` tool handler
//! - `sql_validator`: read-only classification by leading keyword
//! - `table_prefix`: CTE extraction and table-prefix rewriting

pub mod query;
pub mod sql_validator;
pub mod table_prefix;

pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use sql_validator::{classify, validate_readonly};
pub use table_prefix::{RewriteContext, apply_table_prefix, extract_cte_names};
