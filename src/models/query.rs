//! Query-related data models.
//!
//! This module defines the results of row sampling and statement execution.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default number of rows returned by a sample.
pub const DEFAULT_SAMPLE_LIMIT: u32 = 5;

/// Minimum sample size.
pub const MIN_SAMPLE_LIMIT: u32 = 1;

/// Maximum sample size.
pub const MAX_SAMPLE_LIMIT: u32 = 1000;

/// One result row: column name to serialized value, in column order.
pub type Row = serde_json::Map<String, JsonValue>;

/// Result of `get_table_sample`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RowSample {
    /// The name as it was qualified for the query
    pub table_name: String,
    /// Effective limit after clamping
    pub sample_size: u32,
    /// Column names of the first row; empty when no rows came back
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows actually returned
    pub actual_count: usize,
}

/// Rows produced by a read statement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RowSet {
    /// The statement as submitted
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

/// Outcome of a statement executed for its side effect.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MutationResult {
    /// The statement as submitted
    pub query: String,
    /// Trailing count of `status`, if numeric
    pub rows_affected: Option<u64>,
    /// PostgreSQL command tag (e.g., "INSERT 0 1", "CREATE TABLE")
    pub status: String,
}

/// Result of `execute_sql`; which variant applies is decided by the statement's
/// leading keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementOutcome {
    RowSet(RowSet),
    Mutation(MutationResult),
}

impl StatementOutcome {
    pub fn is_row_set(&self) -> bool {
        matches!(self, Self::RowSet(_))
    }
}

/// Column names of a result: the keys of its first row.
pub fn columns_of(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}
