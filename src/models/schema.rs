//! Schema-related data models.
//!
//! This module defines the results of relation enumeration and description.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One base table visible to the connected role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RelationDescriptor {
    /// Unqualified table name
    pub table_name: String,
    /// Owning schema
    pub schema: String,
    /// `schema.table_name`
    pub full_name: String,
}

impl RelationDescriptor {
    pub fn new(schema: impl Into<String>, table_name: impl Into<String>) -> Self {
        let schema = schema.into();
        let table_name = table_name.into();
        let full_name = if schema.is_empty() {
            table_name.clone()
        } else {
            format!("{schema}.{table_name}")
        };
        Self {
            table_name,
            schema,
            full_name,
        }
    }
}

/// Result of `list_tables`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationList {
    /// Number of tables returned
    pub total_tables: usize,
    /// Tables ordered by schema, then name
    pub tables: Vec<RelationDescriptor>,
}

impl From<Vec<RelationDescriptor>> for RelationList {
    fn from(tables: Vec<RelationDescriptor>) -> Self {
        Self {
            total_tables: tables.len(),
            tables,
        }
    }
}

/// Column metadata as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub column_name: String,
    /// SQL type name (e.g., "integer", "character varying")
    pub data_type: String,
    pub nullable: bool,
    /// Default expression, verbatim
    pub default_value: Option<String>,
    /// Character types only
    pub max_length: Option<i32>,
    /// Numeric types only
    pub precision: Option<i32>,
    /// Exact numeric types only
    pub scale: Option<i32>,
}

/// Result of `describe_table`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationDescription {
    /// The name as it was qualified for the lookup
    pub table_name: String,
    /// Exact row count
    pub row_count: i64,
    /// Columns in ordinal order
    pub columns: Vec<ColumnDescriptor>,
    pub total_columns: usize,
}

impl RelationDescription {
    pub fn new(table_name: impl Into<String>, row_count: i64, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table_name: table_name.into(),
            row_count,
            total_columns: columns.len(),
            columns,
        }
    }
}
