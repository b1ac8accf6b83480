//! Row sampling and SQL execution tools.
//!
//! This module implements the `get_table_sample` and `execute_sql` MCP tools.
//! `execute_sql` runs any statement it is given; which statements a caller may
//! submit is decided outside this server.

use crate::db::DatabaseClient;
use crate::error::DbResult;
use crate::models::{DEFAULT_SAMPLE_LIMIT, Row, RowSample, StatementOutcome};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

fn default_limit() -> i64 {
    DEFAULT_SAMPLE_LIMIT as i64
}

/// Input for the get_table_sample tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTableSampleInput {
    /// Table to sample. May be schema-qualified when schema_name is omitted.
    pub table_name: String,
    /// Number of rows to return. Default: 5, clamped to 1..=1000
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Schema containing the table
    #[serde(default, alias = "schema")]
    pub schema_name: Option<String>,
}

/// Input for the execute_sql tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteSqlInput {
    /// SQL to run. Statements starting with SELECT return rows; anything else returns its command status.
    pub query: String,
}

/// Output from the execute_sql tool.
///
/// Row queries fill `columns`, `rows` and `row_count`; other statements fill
/// `status` and `rows_affected`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteSqlOutput {
    /// The statement as submitted
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    /// Present for non-row statements; null when the status carries no count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<Option<u64>>,
    /// PostgreSQL command tag (e.g., "INSERT 0 1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<StatementOutcome> for ExecuteSqlOutput {
    fn from(outcome: StatementOutcome) -> Self {
        match outcome {
            StatementOutcome::RowSet(set) => Self {
                query: set.query,
                columns: Some(set.columns),
                rows: Some(set.rows),
                row_count: Some(set.row_count),
                rows_affected: None,
                status: None,
            },
            StatementOutcome::Mutation(result) => Self {
                query: result.query,
                columns: None,
                rows: None,
                row_count: None,
                rows_affected: Some(result.rows_affected),
                status: Some(result.status),
            },
        }
    }
}

pub struct QueryToolHandler {
    client: DatabaseClient,
}

impl QueryToolHandler {
    pub fn new(client: DatabaseClient) -> Self {
        Self { client }
    }

    pub async fn get_table_sample(&self, input: GetTableSampleInput) -> DbResult<RowSample> {
        let sample = self
            .client
            .sample_rows(
                &input.table_name,
                Some(input.limit),
                input.schema_name.as_deref(),
            )
            .await?;

        info!(
            table = %sample.table_name,
            sample_size = sample.sample_size,
            actual_count = sample.actual_count,
            "Sampled table"
        );

        Ok(sample)
    }

    pub async fn execute_sql(&self, input: ExecuteSqlInput) -> DbResult<StatementOutcome> {
        let outcome = self.client.execute_statement(&input.query).await?;

        match &outcome {
            StatementOutcome::RowSet(set) => {
                info!(row_count = set.row_count, "Query executed")
            }
            StatementOutcome::Mutation(result) => info!(
                status = %result.status,
                rows_affected = ?result.rows_affected,
                "Statement executed"
            ),
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MutationResult, RowSet};
    use serde_json::Value as JsonValue;

    #[test]
    fn test_sample_input_defaults() {
        let input: GetTableSampleInput = serde_json::from_str(r#"{"table_name": "actor"}"#).unwrap();
        assert_eq!(input.limit, 5);
        assert!(input.schema_name.is_none());
    }

    #[test]
    fn test_sample_input_accepts_out_of_range_limit() {
        let input: GetTableSampleInput =
            serde_json::from_str(r#"{"table_name": "actor", "limit": 0, "schema": "public"}"#)
                .unwrap();
        assert_eq!(input.limit, 0);
        assert_eq!(input.schema_name.as_deref(), Some("public"));
    }

    #[test]
    fn test_row_set_output_omits_mutation_fields() {
        let mut row = Row::new();
        row.insert("?column?".to_string(), JsonValue::from(1));
        let output = ExecuteSqlOutput::from(StatementOutcome::RowSet(RowSet {
            query: "SELECT 1".to_string(),
            columns: vec!["?column?".to_string()],
            rows: vec![row],
            row_count: 1,
        }));

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["rows"][0]["?column?"], 1);
        assert!(json.get("status").is_none());
        assert!(json.get("rows_affected").is_none());
    }

    #[test]
    fn test_mutation_output_keeps_null_count() {
        let output = ExecuteSqlOutput::from(StatementOutcome::Mutation(MutationResult {
            query: "CREATE TABLE t (id int)".to_string(),
            rows_affected: None,
            status: "CREATE TABLE".to_string(),
        }));

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "CREATE TABLE");
        assert!(json.get("rows_affected").is_some_and(JsonValue::is_null));
        assert!(json.get("rows").is_none());
    }

    #[test]
    fn test_mutation_output_reports_count() {
        let output = ExecuteSqlOutput::from(StatementOutcome::Mutation(MutationResult {
            query: "INSERT INTO t VALUES (1)".to_string(),
            rows_affected: Some(1),
            status: "INSERT 0 1".to_string(),
        }));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rows_affected"], 1);
    }
}
