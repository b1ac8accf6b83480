//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `describe_table` MCP tools.

use crate::db::DatabaseClient;
use crate::error::DbResult;
use crate::models::{RelationDescription, RelationList};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Only list tables in this schema (e.g., "public"). Omit or leave empty for all schemas.
    #[serde(default, alias = "schema")]
    pub schema_name: Option<String>,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Table to describe. May be schema-qualified (e.g., "public.actor") when schema_name is omitted.
    pub table_name: String,
    /// Schema containing the table. Omit to resolve through the search path.
    #[serde(default, alias = "schema")]
    pub schema_name: Option<String>,
}

pub struct SchemaToolHandler {
    client: DatabaseClient,
}

impl SchemaToolHandler {
    pub fn new(client: DatabaseClient) -> Self {
        Self { client }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<RelationList> {
        let list = self
            .client
            .list_relations(input.schema_name.as_deref())
            .await?;

        info!(
            schema = ?input.schema_name,
            count = list.total_tables,
            "Listed tables"
        );

        Ok(list)
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<RelationDescription> {
        let description = self
            .client
            .describe_relation(&input.table_name, input.schema_name.as_deref())
            .await?;

        info!(
            table = %description.table_name,
            columns = description.total_columns,
            row_count = description.row_count,
            "Described table"
        );

        Ok(description)
    }
}
