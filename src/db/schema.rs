//! Schema introspection module.
//!
//! Relation enumeration and description against PostgreSQL's
//! `information_schema`.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule. Catalog columns are
//! declared with information_schema domain types, so every query casts them to
//! plain `text`/`int4` before sqlx decodes them.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, RelationDescription, RelationDescriptor, RelationList};
use sqlx::{PgPool, Row};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List base tables outside the system schemas, optionally restricted to one
    /// schema. An empty filter is no filter.
    pub async fn list_relations(pool: &PgPool, schema: Option<&str>) -> DbResult<RelationList> {
        let schema = non_empty(schema);
        debug!(schema = ?schema, "Listing relations");

        let rows = sqlx::query(queries::LIST_RELATIONS)
            .bind(schema)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| -> Result<RelationDescriptor, sqlx::Error> {
                Ok(RelationDescriptor::new(
                    row.try_get::<String, _>("table_schema")?,
                    row.try_get::<String, _>("table_name")?,
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(RelationList::from(tables))
    }

    /// Column metadata plus an exact row count for one relation.
    ///
    /// Both queries run on the same pooled connection. The count query is what
    /// validates the name: an unknown relation or schema surfaces as
    /// [`DbError::RelationNotFound`] with the engine's message.
    pub async fn describe_relation(
        pool: &PgPool,
        name: &str,
        schema: Option<&str>,
    ) -> DbResult<RelationDescription> {
        let schema = non_empty(schema);
        let qualified = qualified_name(name, schema);
        let (lookup_schema, lookup_table) = catalog_lookup(name, schema);
        debug!(relation = %qualified, "Describing relation");

        let mut conn = pool.acquire().await?;

        let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
            .bind(lookup_table)
            .bind(lookup_schema)
            .fetch_all(&mut *conn)
            .await?;
        let columns = rows
            .iter()
            .map(column_from_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let row_count: i64 = sqlx::query_scalar(&count_sql(&qualified))
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| DbError::from_relation_lookup(e, &qualified))?;

        Ok(RelationDescription::new(qualified, row_count, columns))
    }
}

fn column_from_row(row: &sqlx::postgres::PgRow) -> Result<ColumnDescriptor, sqlx::Error> {
    let is_nullable: String = row.try_get("is_nullable")?;
    Ok(ColumnDescriptor {
        column_name: row.try_get("column_name")?,
        data_type: row.try_get("data_type")?,
        nullable: is_nullable == "YES",
        default_value: row.try_get("column_default")?,
        max_length: row.try_get("character_maximum_length")?,
        precision: row.try_get("numeric_precision")?,
        scale: row.try_get("numeric_scale")?,
    })
}

/// `schema.name` when a schema is given, otherwise `name` verbatim (left to the
/// search path).
pub fn qualified_name(name: &str, schema: Option<&str>) -> String {
    match non_empty(schema) {
        Some(schema) => format!("{schema}.{name}"),
        None => name.to_string(),
    }
}

/// Schema and table to look up in the catalog.
///
/// A dotted name with no explicit schema is split, so `public.actor` finds the
/// columns of `actor` in `public`. Surrounding double quotes are dropped.
pub fn catalog_lookup<'a>(name: &'a str, schema: Option<&'a str>) -> (Option<&'a str>, &'a str) {
    match non_empty(schema) {
        Some(schema) => (Some(unquote(schema)), unquote(name)),
        None => match name.rsplit_once('.') {
            Some((schema, table)) if !schema.is_empty() && !table.is_empty() => {
                (Some(unquote(schema)), unquote(table))
            }
            _ => (None, unquote(name)),
        },
    }
}

fn unquote(ident: &str) -> &str {
    let ident = ident.trim();
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ident)
}

fn non_empty(schema: Option<&str>) -> Option<&str> {
    schema.filter(|s| !s.trim().is_empty())
}

fn count_sql(qualified: &str) -> String {
    format!("SELECT COUNT(*) FROM {qualified}")
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_RELATIONS: &str = r#"
        SELECT
            table_schema::text AS table_schema,
            table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_type = 'BASE TABLE'
          AND table_schema NOT IN ('pg_catalog', 'information_schema')
          AND ($1::text IS NULL OR table_schema = $1)
        ORDER BY table_schema, table_name
        "#;

    // Without a schema, the first search-path schema holding the table wins.
    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            c.data_type::text AS data_type,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default,
            c.character_maximum_length::int4 AS character_maximum_length,
            c.numeric_precision::int4 AS numeric_precision,
            c.numeric_scale::int4 AS numeric_scale
        FROM information_schema.columns c
        WHERE c.table_name = $1
          AND c.table_schema = COALESCE(
              $2::text,
              (
                  SELECT sp.nspname
                  FROM unnest(current_schemas(false)) WITH ORDINALITY AS sp(nspname, pos)
                  WHERE EXISTS (
                      SELECT 1
                      FROM information_schema.columns ic
                      WHERE ic.table_schema = sp.nspname
                        AND ic.table_name = $1
                  )
                  ORDER BY sp.pos
                  LIMIT 1
              )
          )
        ORDER BY c.ordinal_position
        "#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("actor", Some("public")), "public.actor");
        assert_eq!(qualified_name("actor", None), "actor");
        assert_eq!(qualified_name("public.actor", None), "public.actor");
        assert_eq!(qualified_name("actor", Some("")), "actor");
    }

    #[test]
    fn test_catalog_lookup_with_schema() {
        assert_eq!(catalog_lookup("actor", Some("sales")), (Some("sales"), "actor"));
        assert_eq!(
            catalog_lookup("\"Order\"", Some("\"Sales\"")),
            (Some("Sales"), "Order")
        );
    }

    #[test]
    fn test_catalog_lookup_splits_dotted_name() {
        assert_eq!(catalog_lookup("public.actor", None), (Some("public"), "actor"));
        assert_eq!(catalog_lookup("actor", None), (None, "actor"));
        assert_eq!(catalog_lookup(".actor", None), (None, ".actor"));
        assert_eq!(catalog_lookup("actor", Some("  ")), (None, "actor"));
    }

    #[test]
    fn test_count_sql() {
        assert_eq!(count_sql("public.actor"), "SELECT COUNT(*) FROM public.actor");
    }

    #[test]
    fn test_list_query_excludes_system_schemas() {
        assert!(queries::LIST_RELATIONS.contains("'pg_catalog', 'information_schema'"));
        assert!(queries::LIST_RELATIONS.contains("'BASE TABLE'"));
        assert!(queries::LIST_RELATIONS.contains("ORDER BY table_schema, table_name"));
    }
}
