//! SQL statement validation for read-only enforcement.
//!
//! The `database_query` tool only runs statements whose leading keyword is on a
//! fixed allow-list. Classification is lexical: the first whitespace-delimited
//! token decides, so identifiers or literals later in the query that happen to
//! spell a write keyword (`SELECT * FROM delete`) do not matter.
//!
//! A `WITH` statement must also contain a `SELECT` keyword somewhere after the
//! leading `WITH`. This does not prove the `SELECT` is the final statement:
//! `WITH c AS (SELECT 1) SELECT 1; DROP TABLE users` still passes, and whether
//! it runs is up to the backend's statement-stacking rules.

use crate::error::{DbError, DbResult};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Leading keywords that are considered read-only.
pub const READ_ONLY_KEYWORDS: [&str; 8] = [
    "SELECT", "SHOW", "EXPLAIN", "DESCRIBE", "DESC", "WITH", "VALUES", "TABLE",
];

static SELECT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSELECT\b").expect("valid SELECT regex"));

/// Outcome of classifying one query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_read_only: bool,
    /// Leading token as written
    pub token: String,
    /// Leading token, uppercased
    pub keyword: String,
    /// Why the query was rejected, when it was
    pub reason: Option<String>,
}

/// Classify a query by its leading keyword.
///
/// Returns `DbError::InvalidQuery` when the trimmed input has no token at all.
/// Any other input yields a [`Classification`], read-only or not.
pub fn classify(query: &str) -> DbResult<Classification> {
    let trimmed = query.trim();
    let Some(token) = trimmed.split_whitespace().next() else {
        return Err(DbError::InvalidQuery);
    };

    let keyword = token.to_uppercase();

    let reason = if !READ_ONLY_KEYWORDS.contains(&keyword.as_str()) {
        Some(format!("{} is not a read-only statement", keyword))
    } else if keyword == "WITH" && !SELECT_KEYWORD.is_match(&trimmed[token.len()..]) {
        Some("WITH clause is not followed by a SELECT".to_string())
    } else {
        None
    };

    Ok(Classification {
        is_read_only: reason.is_none(),
        token: token.to_string(),
        keyword,
        reason,
    })
}

/// Validate a query for the read-only tool.
///
/// Returns the trimmed query text on success. Rejections other than empty
/// input fail with `DbError::NotReadOnly`.
///
/// # Examples
///
/// ```
/// use devtools_mcp_server::tools::sql_validator::validate_readonly;
///
/// assert_eq!(validate_readonly("  SELECT 1 \n").unwrap(), "SELECT 1");
/// assert!(validate_readonly("DELETE FROM users").is_err());
/// ```
pub fn validate_readonly(query: &str) -> DbResult<&str> {
    let classification = classify(query)?;
    if !classification.is_read_only {
        warn!(
            keyword = %classification.keyword,
            reason = classification.reason.as_deref().unwrap_or_default(),
            "Rejected query"
        );
        return Err(DbError::not_read_only(classification.token));
    }
    Ok(query.trim())
}
