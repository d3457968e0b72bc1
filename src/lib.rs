//! DevTools MCP Server Library
//!
//! Read-only SQL access for AI assistants over MCP (SQLite, PostgreSQL, MySQL),
//! with table-prefix rewriting, plus an installer that registers the server
//! with coding agents.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod install;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DevToolsService;
