//! Query execution engine.
//!
//! Row sampling and caller-submitted statement execution. Everything here runs
//! over the simple query protocol (`sqlx::raw_sql`): cells come back as text,
//! which [`crate::db::types`] turns into JSON, and mutations may be
//! multi-statement batches.
//!
//! Failed statements are never retried.

use crate::db::command_tag::{command_tag, is_row_query, parse_rows_affected};
use crate::db::schema::qualified_name;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    DEFAULT_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT, MIN_SAMPLE_LIMIT, MutationResult, Row, RowSample,
    RowSet, StatementOutcome, columns_of,
};
use futures_util::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::{Either, PgPool};
use std::time::Instant;
use tracing::debug;

/// Clamp a requested sample size into `[MIN_SAMPLE_LIMIT, MAX_SAMPLE_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> u32 {
    let requested = limit.unwrap_or(DEFAULT_SAMPLE_LIMIT as i64);
    requested.clamp(MIN_SAMPLE_LIMIT as i64, MAX_SAMPLE_LIMIT as i64) as u32
}

/// Query executor for sampling and statement execution.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Fetch up to `limit` rows (clamped, default 5) from a relation.
    pub async fn sample_rows(
        pool: &PgPool,
        name: &str,
        limit: Option<i64>,
        schema: Option<&str>,
    ) -> DbResult<RowSample> {
        let sample_size = clamp_limit(limit);
        let qualified = qualified_name(name, schema);
        let sql = format!("SELECT * FROM {qualified} LIMIT {sample_size}");
        debug!(relation = %qualified, limit = sample_size, "Sampling rows");

        let rows = sqlx::raw_sql(&sql)
            .fetch_all(pool)
            .await
            .map_err(|e| DbError::from_relation_lookup(e, &qualified))?;
        let rows = to_json_rows(&rows);

        Ok(RowSample {
            table_name: qualified,
            sample_size,
            columns: columns_of(&rows),
            actual_count: rows.len(),
            rows,
        })
    }

    /// Run a caller-submitted statement.
    ///
    /// Text starting with `select` (any case, after trimming) returns its rows;
    /// anything else is executed for its side effect and returns the command tag.
    /// No statement is refused on the basis of its content.
    pub async fn execute_statement(pool: &PgPool, text: &str) -> DbResult<StatementOutcome> {
        let statement = text.trim();
        let start = Instant::now();

        if is_row_query(statement) {
            debug!(sql = %statement, "Executing row query");
            let rows = sqlx::raw_sql(statement)
                .fetch_all(pool)
                .await
                .map_err(DbError::from_execution)?;
            let rows = to_json_rows(&rows);
            debug!(
                row_count = rows.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Row query finished"
            );

            return Ok(StatementOutcome::RowSet(RowSet {
                query: text.to_string(),
                columns: columns_of(&rows),
                row_count: rows.len(),
                rows,
            }));
        }

        debug!(sql = %statement, "Executing statement");
        let rows_affected = last_rows_affected(pool, statement).await?;
        let status = command_tag(statement, rows_affected);
        debug!(
            status = %status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement finished"
        );

        Ok(StatementOutcome::Mutation(MutationResult {
            query: text.to_string(),
            rows_affected: parse_rows_affected(&status),
            status,
        }))
    }
}

/// Run `statement` and return the affected-row count of its last command.
///
/// `execute` would sum the counts of every statement in a batch.
async fn last_rows_affected(pool: &PgPool, statement: &str) -> DbResult<u64> {
    let mut results = sqlx::raw_sql(statement).fetch_many(pool);
    let mut last = 0;
    while let Some(step) = results.try_next().await.map_err(DbError::from_execution)? {
        if let Either::Left(done) = step {
            last = done.rows_affected();
        }
    }
    Ok(last)
}

fn to_json_rows(rows: &[PgRow]) -> Vec<Row> {
    rows.iter().map(|row| row.to_json_map()).collect()
}
