//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool lifecycle management
//! - Schema introspection
//! - Row sampling and statement execution
//! - Cell decoding and value serialization
//! - Statement classification and command tags

pub mod command_tag;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ContextToken, PoolHandle, PoolRegistry};
pub use schema::SchemaInspector;

use crate::error::{DbError, DbResult};
use crate::models::{RelationDescription, RelationList, RowSample, StatementOutcome};
use std::sync::Arc;

/// Entry point for the four database operations.
///
/// Binds the shared [`PoolRegistry`] to the execution context the client was
/// created for; every call acquires the pool through that context.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    registry: Arc<PoolRegistry>,
    context: ContextToken,
}

impl DatabaseClient {
    pub fn new(registry: Arc<PoolRegistry>, context: ContextToken) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub async fn acquire(&self) -> DbResult<PoolHandle> {
        self.registry.acquire_pool(&self.context).await
    }

    pub async fn list_relations(&self, schema: Option<&str>) -> DbResult<RelationList> {
        let handle = self.acquire().await?;
        SchemaInspector::list_relations(handle.pool(), schema)
            .await
            .map_err(|e| self.with_limits(e))
    }

    pub async fn describe_relation(
        &self,
        name: &str,
        schema: Option<&str>,
    ) -> DbResult<RelationDescription> {
        let handle = self.acquire().await?;
        SchemaInspector::describe_relation(handle.pool(), name, schema)
            .await
            .map_err(|e| self.with_limits(e))
    }

    pub async fn sample_rows(
        &self,
        name: &str,
        limit: Option<i64>,
        schema: Option<&str>,
    ) -> DbResult<RowSample> {
        let handle = self.acquire().await?;
        QueryExecutor::sample_rows(handle.pool(), name, limit, schema)
            .await
            .map_err(|e| self.with_limits(e))
    }

    pub async fn execute_statement(&self, text: &str) -> DbResult<StatementOutcome> {
        let handle = self.acquire().await?;
        QueryExecutor::execute_statement(handle.pool(), text).await
    }

    fn with_limits(&self, err: DbError) -> DbError {
        err.with_acquire_limit(self.registry.config().acquire_timeout)
    }
}
