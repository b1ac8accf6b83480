//! Postgres MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools that let AI
//! assistants explore and query a PostgreSQL database: list tables, describe a
//! table, sample rows and execute SQL.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::{ContextToken, DatabaseClient, PoolRegistry};
pub use error::DbError;
pub use mcp::PgService;
