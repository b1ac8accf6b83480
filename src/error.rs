//! Error types for the Postgres MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Engine diagnostics are carried verbatim so the calling agent sees exactly what
//! PostgreSQL reported.

use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;
use std::time::Duration;
use thiserror::Error;

/// SQLSTATE for an undefined table.
pub const SQLSTATE_UNDEFINED_TABLE: &str = "42P01";

/// SQLSTATE for an invalid schema name.
pub const SQLSTATE_INVALID_SCHEMA_NAME: &str = "3F000";

const POOL_ACQUIRE: &str = "connection pool acquire";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("{message}")]
    RelationNotFound {
        relation: String,
        message: String,
        sql_state: Option<String>,
    },

    #[error("{message}")]
    QueryExecution {
        message: String,
        /// e.g., "42601" for a syntax error
        sql_state: Option<String>,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        sql_state: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a relation-not-found error.
    pub fn relation_not_found(
        relation: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self::RelationNotFound {
            relation: relation.into(),
            message: message.into(),
            sql_state,
        }
    }

    /// Create a statement execution error.
    pub fn query_execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::QueryExecution {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Report a pool-acquire timeout against the configured `limit`.
    pub fn with_acquire_limit(self, limit: Duration) -> Self {
        match self {
            Self::Timeout { operation, .. } if operation == POOL_ACQUIRE => {
                Self::timeout(operation, limit.as_secs_f64().ceil() as u32)
            }
            other => other,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map an error raised while resolving `relation` in describe/sample calls.
    ///
    /// Name rejections become [`DbError::RelationNotFound`]; everything else goes
    /// through the regular `sqlx::Error` conversion.
    pub fn from_relation_lookup(err: sqlx::Error, relation: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().map(|c| c.to_string());
            if matches!(
                code.as_deref(),
                Some(SQLSTATE_UNDEFINED_TABLE) | Some(SQLSTATE_INVALID_SCHEMA_NAME)
            ) {
                return Self::relation_not_found(relation, db_err.message(), code);
            }
        }
        Self::from(err)
    }

    /// Map an error raised while executing a caller-submitted statement.
    pub fn from_execution(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                Self::query_execution(db_err.message(), code)
            }
            other => Self::query_execution(other.to_string(), None),
        }
    }

    /// Stable name of the error class, reported to MCP clients as `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "ConfigurationError",
            Self::Connection { .. } => "ConnectionError",
            Self::RelationNotFound { .. } => "RelationNotFound",
            Self::QueryExecution { .. } => "QueryExecutionError",
            Self::Database { .. } => "DatabaseError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Internal { .. } => "InternalError",
        }
    }

    /// SQLSTATE reported by the engine, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::RelationNotFound { sql_state, .. }
            | Self::QueryExecution { sql_state, .. }
            | Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Configuration { .. } => {
                Some("Set PGUSER, PGPASSWORD and PGDATABASE (or DATABASE_URL)")
            }
            Self::RelationNotFound { .. } => {
                Some("Call list_tables to see the available tables and schemas")
            }
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout(POOL_ACQUIRE, DEFAULT_ACQUIRE_TIMEOUT_SECS as u32)
            },
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Retry; the pool is rebuilt on demand")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify PGSSL and that the server accepts TLS connections",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build the `data` object attached to MCP errors.
fn error_data(err: &DbError) -> serde_json::Value {
    let mut data = serde_json::json!({ "type": err.kind(), "status": "error" });
    if let Some(code) = err.sql_state() {
        data["sql_state"] = serde_json::Value::String(code.to_string());
    }
    if let Some(suggestion) = err.suggestion() {
        data["suggestion"] = serde_json::Value::String(suggestion.to_string());
    }
    data
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = Some(error_data(&err));
        match &err {
            // Caller-correctable: bad names, bad SQL
            DbError::RelationNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }
            DbError::QueryExecution { .. } | DbError::Database { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::Configuration { .. }
            | DbError::Connection { .. }
            | DbError::Timeout { .. }
            | DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_engine_messages_are_not_rewrapped() {
        let err = DbError::relation_not_found(
            "public.missing",
            "relation \"public.missing\" does not exist",
            Some(SQLSTATE_UNDEFINED_TABLE.to_string()),
        );
        assert_eq!(
            err.to_string(),
            "relation \"public.missing\" does not exist"
        );

        let err = DbError::query_execution("syntax error at or near \"SELEC\"", None);
        assert_eq!(err.to_string(), "syntax error at or near \"SELEC\"");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DbError::configuration("x").kind(), "ConfigurationError");
        assert_eq!(
            DbError::relation_not_found("t", "m", None).kind(),
            "RelationNotFound"
        );
        assert_eq!(
            DbError::query_execution("m", None).kind(),
            "QueryExecutionError"
        );
    }

    #[test]
    fn test_execution_maps_non_database_errors() {
        let err = DbError::from_execution(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DbError::QueryExecution { sql_state: None, .. }));
    }

    #[test]
    fn test_relation_lookup_passes_other_errors_through() {
        let err = DbError::from_relation_lookup(sqlx::Error::PoolClosed, "t");
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
    }

    #[test]
    fn test_pool_timeout_reports_configured_limit() {
        let err = DbError::from(sqlx::Error::PoolTimedOut).with_acquire_limit(Duration::from_secs(5));
        assert!(matches!(err, DbError::Timeout { elapsed_secs: 5, .. }));
        assert_eq!(
            err.to_string(),
            "Timeout: connection pool acquire exceeded 5s"
        );

        let err = DbError::from(sqlx::Error::PoolTimedOut)
            .with_acquire_limit(Duration::from_millis(500));
        assert!(matches!(err, DbError::Timeout { elapsed_secs: 1, .. }));

        let other = DbError::timeout("statement", 9).with_acquire_limit(Duration::from_secs(5));
        assert!(matches!(other, DbError::Timeout { elapsed_secs: 9, .. }));
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_relation_not_found_maps_to_resource_not_found() {
        let err = DbError::relation_not_found("t", "relation \"t\" does not exist", None);
        let mcp_err: rmcp::ErrorData = err.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_query_execution_maps_to_invalid_params() {
        let err = DbError::query_execution("division by zero", Some("22012".to_string()));
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert_eq!(mcp_err.message, "division by zero");
    }

    #[test]
    fn test_configuration_maps_to_internal_error() {
        let err = DbError::configuration("Missing Postgres settings: user");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_error_data_carries_type_and_sql_state() {
        let err = DbError::query_execution("duplicate key", Some("23505".to_string()));
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.expect("data should be present");
        assert_eq!(data["type"], "QueryExecutionError");
        assert_eq!(data["sql_state"], "23505");
        assert_eq!(data["status"], "error");
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let err = DbError::connection("failed", "try reconnecting");
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try reconnecting");
        assert!(data.get("sql_state").is_none());
    }
}
