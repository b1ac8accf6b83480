//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `list_tables`: List base tables, optionally within one schema
//! - `describe_table`: Column metadata and exact row count of a table
//! - `get_table_sample`: First rows of a table
//! - `execute_sql`: Run any SQL statement

pub mod query;
pub mod schema;

pub use query::{ExecuteSqlInput, ExecuteSqlOutput, GetTableSampleInput, QueryToolHandler};
pub use schema::{DescribeTableInput, ListTablesInput, SchemaToolHandler};
