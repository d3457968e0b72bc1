//! Table-prefix rewriting for connections that namespace their tables.
//!
//! Some applications share one database by prefixing every table name
//! (`wp_users`, `wp_posts`). Agents usually write the bare name, so before a
//! query runs on such a connection the identifier following `FROM`, `JOIN`,
//! `INTO`, `UPDATE`, `TABLE`, `DESCRIBE` or `DESC` gets the prefix inserted.
//!
//! The rewrite is regex based, not a parser. Names introduced by a common
//! table expression (`WITH recent AS (...)`) are collected from the original
//! query first and never prefixed, even where they follow a trigger keyword.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/// Keywords after which an identifier is treated as a table reference.
pub const TRIGGER_KEYWORDS: [&str; 7] = ["FROM", "JOIN", "INTO", "UPDATE", "TABLE", "DESCRIBE", "DESC"];

/// Bare words that end an `ORDER BY ... DESC` rather than name a table.
const AFTER_DESC_CLAUSES: [&str; 9] = [
    "LIMIT", "OFFSET", "NULLS", "FETCH", "FOR", "UNION", "EXCEPT", "INTERSECT", "WINDOW",
];

/// Bare words that can follow `TABLE` without naming one (`SHOW TABLE STATUS`).
const AFTER_TABLE_CLAUSES: [&str; 1] = ["STATUS"];

/// Clause words that are not table names when they follow `trigger` unquoted.
/// Only `DESC` and `TABLE` double as non-table keywords.
fn clause_keywords(trigger: &str) -> &'static [&'static str] {
    if trigger.eq_ignore_ascii_case("DESC") {
        &AFTER_DESC_CLAUSES
    } else if trigger.eq_ignore_ascii_case("TABLE") {
        &AFTER_TABLE_CLAUSES
    } else {
        &[]
    }
}

static TABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    let keywords = TRIGGER_KEYWORDS.join("|");
    Regex::new(&format!(
        r#"(?i)\b(?P<keyword>{keywords})(?P<space>\s+)(?:`(?P<backtick>\w+)`|"(?P<double>\w+)"|'(?P<single>\w+)'|(?P<bare>\w+))"#
    ))
    .expect("valid table reference regex")
});

static CTE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w+)\s*(?:\([^)]*\))?\s+AS\s*\(").expect("valid CTE regex")
});

/// Collect the names defined as `<name> [(<columns>)] AS (` in a query.
///
/// Names are returned in order of first occurrence; duplicates are kept.
pub fn extract_cte_names(query: &str) -> Vec<String> {
    CTE_DEFINITION
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// State for one rewrite pass over one query.
#[derive(Debug, Clone)]
pub struct RewriteContext<'a> {
    prefix: &'a str,
    cte_names: Vec<String>,
}

impl<'a> RewriteContext<'a> {
    /// Build a context for `query`, extracting its CTE names up front.
    pub fn new(prefix: &'a str, query: &str) -> Self {
        Self {
            prefix,
            cte_names: extract_cte_names(query),
        }
    }

    pub fn prefix(&self) -> &str {
        self.prefix
    }

    pub fn cte_names(&self) -> &[String] {
        &self.cte_names
    }

    /// True if `identifier` names a CTE of the query (SQL identifiers fold case).
    pub fn is_cte(&self, identifier: &str) -> bool {
        self.cte_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(identifier))
    }

    fn should_prefix(&self, trigger: &str, identifier: &str, quoted: bool) -> bool {
        if identifier.starts_with(self.prefix) || self.is_cte(identifier) {
            return false;
        }
        quoted
            || !clause_keywords(trigger)
                .iter()
                .any(|kw| kw.eq_ignore_ascii_case(identifier))
    }

    /// Rewrite `query` in a single left-to-right pass.
    ///
    /// Returns the input borrowed when nothing needed a prefix.
    pub fn rewrite<'q>(&self, query: &'q str) -> Cow<'q, str> {
        if self.prefix.is_empty() {
            return Cow::Borrowed(query);
        }

        let mut output = String::new();
        let mut last = 0;
        let mut rewritten = 0usize;

        for caps in TABLE_REFERENCE.captures_iter(query) {
            let (Some(span), Some(keyword), Some(space)) =
                (caps.get(0), caps.name("keyword"), caps.name("space"))
            else {
                continue;
            };
            let Some((quote, identifier)) = table_reference(&caps) else {
                continue;
            };

            if !self.should_prefix(keyword.as_str(), identifier, !quote.is_empty()) {
                debug!(identifier, "Leaving table reference unprefixed");
                continue;
            }

            if output.is_empty() {
                output.reserve(query.len() + self.prefix.len() * 4);
            }
            output.push_str(&query[last..span.start()]);
            output.push_str(keyword.as_str());
            output.push_str(space.as_str());
            output.push_str(quote);
            output.push_str(self.prefix);
            output.push_str(identifier);
            output.push_str(quote);
            last = span.end();
            rewritten += 1;
        }

        if rewritten == 0 {
            return Cow::Borrowed(query);
        }

        output.push_str(&query[last..]);
        debug!(prefix = self.prefix, rewritten, "Applied table prefix");
        Cow::Owned(output)
    }
}

/// Quote character and bare identifier of a matched table reference.
fn table_reference<'h>(caps: &Captures<'h>) -> Option<(&'static str, &'h str)> {
    [("`", "backtick"), ("\"", "double"), ("'", "single"), ("", "bare")]
        .into_iter()
        .find_map(|(quote, group)| caps.name(group).map(|m| (quote, m.as_str())))
}

/// Insert `prefix` before every unprefixed, non-CTE table reference in `query`.
///
/// # Examples
///
/// ```
/// use devtools_mcp_server::tools::table_prefix::apply_table_prefix;
///
/// assert_eq!(
///     apply_table_prefix("SELECT * FROM users", "wp_"),
///     "SELECT * FROM wp_users"
/// );
/// ```
pub fn apply_table_prefix<'q>(query: &'q str, prefix: &str) -> Cow<'q, str> {
    if prefix.is_empty() {
        return Cow::Borrowed(query);
    }
    RewriteContext::new(prefix, query).rewrite(query)
}
