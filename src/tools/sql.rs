//! SQL tools
//!
//! The database engine is external; tools delegate to a [`SqlBackend`]
//! implementation provided at orchestrator construction. The sql navigator
//! receives operation intent from the planner and turns it into concrete
//! queries itself, so the tool surface stays small.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// Interface to the database the test run targets
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Run a read-only query and return rows rendered as text
    async fn execute_select(&self, query: &str) -> Result<String>;

    /// List table names visible to the test connection
    async fn list_tables(&self) -> Result<String>;
}

/// Runs a SELECT (or CTE) query against the configured backend
pub struct ExecuteSelectQueryTool {
    backend: Arc<dyn SqlBackend>,
}

impl ExecuteSelectQueryTool {
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
struct SelectArgs {
    query: String,
}

#[async_trait]
impl Tool for ExecuteSelectQueryTool {
    fn name(&self) -> &str {
        "execute_select_query_sql"
    }

    fn description(&self) -> &str {
        "Executes a read-only SELECT or CTE query against the configured database and returns the result rows."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The SELECT or WITH query to execute."}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SelectArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("execute_select_query_sql: {}", e)))?;

        let trimmed = args.query.trim_start().to_lowercase();
        if !trimmed.starts_with("select") && !trimmed.starts_with("with") {
            return Ok(ToolResult::failure(
                "only SELECT and WITH queries are allowed",
            ));
        }

        info!("Executing SQL query ({} chars)", args.query.len());
        match self.backend.execute_select(&args.query).await {
            Ok(rows) => Ok(ToolResult::success(rows)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

/// Lists the tables visible to the test connection
pub struct ListTablesTool {
    backend: Arc<dyn SqlBackend>,
}

impl ListTablesTool {
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "list_tables_sql"
    }

    fn description(&self) -> &str {
        "Lists the tables visible to the configured database connection."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        match self.backend.list_tables().await {
            Ok(tables) => Ok(ToolResult::success(tables)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBackend;

    #[async_trait]
    impl SqlBackend for FakeBackend {
        async fn execute_select(&self, query: &str) -> Result<String> {
            Ok(format!("1 row for: {}", query))
        }
        async fn list_tables(&self) -> Result<String> {
            Ok("users, orders".into())
        }
    }

    #[tokio::test]
    async fn select_query_runs() {
        let tool = ExecuteSelectQueryTool::new(Arc::new(FakeBackend));
        let result = tool
            .execute(serde_json::json!({"query": "SELECT 1"}))
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn mutating_query_is_rejected() {
        let tool = ExecuteSelectQueryTool::new(Arc::new(FakeBackend));
        let result = tool
            .execute(serde_json::json!({"query": "DROP TABLE users"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("only SELECT"));
    }

    #[tokio::test]
    async fn cte_query_is_allowed() {
        let tool = ExecuteSelectQueryTool::new(Arc::new(FakeBackend));
        let result = tool
            .execute(serde_json::json!({"query": "WITH t AS (SELECT 1) SELECT * FROM t"}))
            .await
            .unwrap();
        assert!(result.success);
    }
}
