//! Cell decoding and value serialization.
//!
//! Row-producing statements run over the simple query protocol, so every cell
//! arrives in PostgreSQL's text form. Decoding is therefore a two-phase affair:
//! 1. `TypeCategory` classifies the column's type name
//! 2. the cell text is parsed into a [`SqlValue`] for that category
//!
//! [`serialize`] then turns a `SqlValue` into a JSON scalar. Neither phase can fail:
//! anything that does not parse is kept as its text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Text,
    Other,
}

/// Classify a PostgreSQL type name (as reported by sqlx) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    match type_name.to_ascii_uppercase().as_str() {
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" | "SMALLSERIAL"
        | "SERIAL" | "BIGSERIAL" => TypeCategory::Integer,
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => TypeCategory::Float,
        "NUMERIC" | "DECIMAL" => TypeCategory::Numeric,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => {
            TypeCategory::Text
        }
        _ => TypeCategory::Other,
    }
}

// =============================================================================
// Decoded Values
// =============================================================================

/// A database value after decoding, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    /// Numeric, interval, uuid, json, arrays, ...: kept as the engine rendered it.
    Rendered(String),
    /// Raw bytes of a cell that had no text form.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Parse a cell's text according to its type category.
    pub fn from_text(category: TypeCategory, text: String) -> Self {
        let parsed = match category {
            TypeCategory::Integer => text.trim().parse().ok().map(SqlValue::Int),
            TypeCategory::Float => text.trim().parse().ok().map(SqlValue::Float),
            TypeCategory::Boolean => match text.as_str() {
                "t" | "true" => Some(SqlValue::Bool(true)),
                "f" | "false" => Some(SqlValue::Bool(false)),
                _ => None,
            },
            TypeCategory::Date => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()
                .map(SqlValue::Date),
            TypeCategory::Time => NaiveTime::parse_from_str(&text, "%H:%M:%S%.f")
                .ok()
                .map(SqlValue::Time),
            TypeCategory::Timestamp => NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(SqlValue::Timestamp),
            TypeCategory::TimestampTz => {
                DateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f%#z")
                    .ok()
                    .map(SqlValue::TimestampTz)
            }
            TypeCategory::Text => return SqlValue::Text(text),
            TypeCategory::Numeric | TypeCategory::Other => None,
        };
        // infinity, BC dates, NaN numerics ... keep the engine's spelling
        parsed.unwrap_or(SqlValue::Rendered(text))
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Convert a decoded value into a transport-safe JSON scalar.
///
/// Null, text, integers, floats and booleans pass through; temporal values are
/// rendered in ISO-8601; everything else becomes its string form. Total.
pub fn serialize(value: SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Bool(b) => JsonValue::Bool(b),
        SqlValue::Int(i) => JsonValue::Number(i.into()),
        SqlValue::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(render_non_finite(f))),
        SqlValue::Text(s) | SqlValue::Rendered(s) => JsonValue::String(s),
        SqlValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        SqlValue::Time(t) => JsonValue::String(iso_time(&t)),
        SqlValue::Timestamp(ts) => JsonValue::String(format!(
            "{}T{}",
            ts.date().format("%Y-%m-%d"),
            iso_time(&ts.time())
        )),
        SqlValue::TimestampTz(ts) => JsonValue::String(format!(
            "{}T{}{}",
            ts.date_naive().format("%Y-%m-%d"),
            iso_time(&ts.time()),
            ts.format("%:z")
        )),
        SqlValue::Bytes(bytes) => JsonValue::String(hex_bytes(&bytes)),
    }
}

/// `HH:MM:SS`, with `.ffffff` only when there is a fractional part.
fn iso_time(t: &NaiveTime) -> String {
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", t.format("%H:%M:%S"), micros)
    }
}

fn render_non_finite(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

/// PostgreSQL's `bytea` hex output: `\x` followed by lowercase hex digits.
fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Read one cell. Never fails; a cell without a text form falls back to its bytes.
pub fn decode_cell(row: &PgRow, idx: usize) -> SqlValue {
    let category = row
        .columns()
        .get(idx)
        .map(|col| categorize_type(col.type_info().name()))
        .unwrap_or(TypeCategory::Other);

    match row.try_get_unchecked::<Option<String>, _>(idx) {
        Ok(Some(text)) => SqlValue::from_text(category, text),
        Ok(None) => SqlValue::Null,
        Err(e) => {
            tracing::debug!(column = idx, error = %e, "Cell has no text form; using raw bytes");
            row.try_get_unchecked::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(SqlValue::Bytes)
                .unwrap_or(SqlValue::Null)
        }
    }
}

/// Trait for converting database rows to ordered JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name().to_string(), serialize(decode_cell(self, idx))))
            .collect()
    }
}
