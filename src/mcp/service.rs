//! MCP service implementation using rmcp.
//!
//! This module defines the PgService struct with the four database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::DatabaseClient;
use crate::models::{RelationDescription, RelationList, RowSample};
use crate::tools::query::{ExecuteSqlInput, ExecuteSqlOutput, GetTableSampleInput, QueryToolHandler};
use crate::tools::schema::{DescribeTableInput, ListTablesInput, SchemaToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

#[derive(Clone)]
pub struct PgService {
    /// Database operations bound to the serving execution context
    client: DatabaseClient,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl PgService {
    pub fn new(client: DatabaseClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    pub fn client(&self) -> &DatabaseClient {
        &self.client
    }
}

#[tool_router]
impl PgService {
    #[tool(
        description = "List base tables in the PostgreSQL database, excluding system schemas.\nOptionally restrict to one schema with `schema_name`."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<RelationList>, McpError> {
        SchemaToolHandler::new(self.client.clone())
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Describe a table: column names, types, nullability, defaults, length/precision/scale, and the exact row count.\nPass `schema_name` or a schema-qualified `table_name`."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<RelationDescription>, McpError> {
        SchemaToolHandler::new(self.client.clone())
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Return the first rows of a table.\n`limit` defaults to 5 and is clamped to 1..1000."
    )]
    async fn get_table_sample(
        &self,
        Parameters(input): Parameters<GetTableSampleInput>,
    ) -> Result<Json<RowSample>, McpError> {
        QueryToolHandler::new(self.client.clone())
            .get_table_sample(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a SQL statement.\nStatements starting with SELECT return `columns`, `rows` and `row_count`.\nAny other statement (INSERT, UPDATE, DELETE, DDL, ...) is executed and returns its `status` and `rows_affected`.\nStatements run without an allow-list; changes are committed immediately."
    )]
    async fn execute_sql(
        &self,
        Parameters(input): Parameters<ExecuteSqlInput>,
    ) -> Result<Json<ExecuteSqlOutput>, McpError> {
        QueryToolHandler::new(self.client.clone())
            .execute_sql(input)
            .await
            .map(|outcome| Json(outcome.into()))
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for PgService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "postgres-mcp-server".to_owned(),
                title: Some("PostgreSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for exploring and querying one PostgreSQL database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` to see the available tables and their schemas\n\
                2. Call `describe_table` for column types and the row count\n\
                3. Call `get_table_sample` to look at a few rows\n\
                4. Call `execute_sql` to run your own SQL\n\
                \n\
                ## Notes\n\
                - Only statements beginning with SELECT return rows. Wrap CTEs or EXPLAIN in a SELECT-led query if you need their rows.\n\
                - Non-SELECT statements are executed and committed; there is no dry-run.\n\
                - Errors carry PostgreSQL's own message and SQLSTATE."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::db::{ContextToken, PoolRegistry};
    use std::sync::Arc;

    fn create_test_service() -> PgService {
        let config = PoolConfig {
            min_size: 0,
            ..PoolConfig::new("app", "pw", "shop")
        };
        let registry = Arc::new(PoolRegistry::new(config));
        PgService::new(DatabaseClient::new(registry, ContextToken::new()))
    }

    #[test]
    fn test_pg_service_creation() {
        let service = create_test_service();
        assert_eq!(service.client().registry().constructed_count(), 0);
    }

    #[test]
    fn test_exposes_four_tools() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["describe_table", "execute_sql", "get_table_sample", "list_tables"]
        );
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "postgres-mcp-server");
        assert!(info.capabilities.tools.is_some());
    }
}
