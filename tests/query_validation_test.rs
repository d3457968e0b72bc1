//! Integration tests for the read-only gate and table-prefix rewriting.

use devtools_mcp_server::error::DbError;
use devtools_mcp_server::tools::{apply_table_prefix, classify, extract_cte_names, validate_readonly};

#[test]
fn test_blank_input_is_invalid() {
    for query in ["", "   ", "\n\t  \r\n"] {
        let err = validate_readonly(query).unwrap_err();
        assert!(matches!(err, DbError::InvalidQuery), "{:?}", query);
        assert_eq!(err.to_string(), "Please pass a valid query");
    }
}

#[test]
fn test_allowed_leading_keywords_any_case() {
    let queries = [
        "SELECT 1",
        "select * from users",
        "Show tables",
        "EXPLAIN SELECT * FROM users",
        "describe users",
        "DESC users",
        "VALUES (1, 2)",
        "TABLE users",
        "  \n SELECT 1  ",
    ];
    for query in queries {
        assert!(validate_readonly(query).is_ok(), "should allow {:?}", query);
    }
}

#[test]
fn test_disallowed_keywords_are_not_read_only() {
    let queries = [
        "DELETE FROM users",
        "UPDATE users SET name = 'x'",
        "INSERT INTO users VALUES (1)",
        "DROP TABLE users",
        "REPLACE INTO users VALUES (1)",
        "TRUNCATE users",
        "ALTER TABLE users ADD COLUMN x INT",
        "CREATE TABLE t (id INT)",
        "RENAME TABLE a TO b",
        "delete from users",
    ];
    for query in queries {
        let err = validate_readonly(query).unwrap_err();
        assert!(
            matches!(err, DbError::NotReadOnly { .. }),
            "should reject {:?}, got {:?}",
            query,
            err
        );
        assert!(err.to_string().starts_with("Only read-only queries are allowed"));
    }
}

#[test]
fn test_keywords_after_leading_token_are_ignored() {
    assert!(validate_readonly("SELECT * FROM delete").is_ok());
    assert!(validate_readonly("SELECT 'DROP TABLE users' AS note").is_ok());
}

#[test]
fn test_with_requires_select() {
    assert!(validate_readonly("WITH cte AS (SELECT 1) SELECT * FROM cte").is_ok());

    let classification = classify("WITH cte AS (INSERT INTO x VALUES (1))").unwrap();
    assert!(!classification.is_read_only);
    assert!(validate_readonly("WITH cte AS (INSERT INTO x VALUES (1))").is_err());
}

#[test]
fn test_stacked_statement_after_with_select_passes() {
    // Lexical gate: only the presence of SELECT after WITH is checked
    assert!(validate_readonly("WITH cte AS (SELECT 1) SELECT 1; DROP TABLE users").is_ok());
}

#[test]
fn test_prefix_is_idempotent() {
    let query = "SELECT * FROM wp_users";
    assert_eq!(apply_table_prefix(query, "wp_"), query);
}

#[test]
fn test_prefix_skips_cte_names() {
    let query = "WITH cte AS (SELECT * FROM users) SELECT * FROM cte";
    assert_eq!(extract_cte_names(query), vec!["cte".to_string()]);
    assert_eq!(
        apply_table_prefix(query, "wp_"),
        "WITH cte AS (SELECT * FROM wp_users) SELECT * FROM cte"
    );
}

#[test]
fn test_prefix_multiple_triggers() {
    assert_eq!(
        apply_table_prefix(
            "SELECT * FROM users JOIN posts ON users.id = posts.user_id",
            "wp_"
        ),
        "SELECT * FROM wp_users JOIN wp_posts ON users.id = posts.user_id"
    );
}

#[test]
fn test_prefix_preserves_quotes() {
    assert_eq!(
        apply_table_prefix("SELECT * FROM `users`", "wp_"),
        "SELECT * FROM `wp_users`"
    );
    assert_eq!(
        apply_table_prefix("SELECT * FROM \"users\"", "wp_"),
        "SELECT * FROM \"wp_users\""
    );
}

#[test]
fn test_empty_prefix_is_noop() {
    let query = "SELECT * FROM users JOIN posts ON 1 = 1";
    assert_eq!(apply_table_prefix(query, ""), query);
}

#[test]
fn test_describe_and_table_statements_are_prefixed() {
    assert_eq!(apply_table_prefix("DESCRIBE users", "wp_"), "DESCRIBE wp_users");
    assert_eq!(apply_table_prefix("TABLE users", "wp_"), "TABLE wp_users");
}
