//! Data models for the Postgres MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

pub use query::{
    DEFAULT_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT, MIN_SAMPLE_LIMIT, MutationResult, Row, RowSample,
    RowSet, StatementOutcome, columns_of,
};
pub use schema::{ColumnDescriptor, RelationDescription, RelationDescriptor, RelationList};
