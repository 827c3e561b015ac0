//! MCP-to-Tool bridge
//!
//! Adapts tools exposed by an MCP server into the [`Tool`] trait so they can
//! be registered for the `mcp` navigator alongside built-in tools. The
//! transport itself (stdio, SSE) is an external collaborator behind
//! [`McpTransport`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// A tool advertised by an MCP server
#[derive(Debug, Clone, Deserialize)]
pub struct McpToolSpec {
    /// Tool name as the server knows it
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool's input
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of one MCP tool invocation
#[derive(Debug, Clone, Deserialize)]
pub struct McpCallResult {
    /// Text content blocks joined by the transport
    pub text: String,
    /// Whether the server flagged the call as an error
    #[serde(default)]
    pub is_error: bool,
}

/// Connection to a single MCP server
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Tools the server currently advertises
    async fn list_tools(&self) -> Result<Vec<McpToolSpec>>;

    /// Invoke a tool by name
    async fn call_tool(&self, name: &str, args: Value) -> Result<McpCallResult>;
}

/// Bridge that wraps one MCP server tool as a registry tool
pub struct McpToolBridge {
    transport: Arc<dyn McpTransport>,
    spec: McpToolSpec,
}

impl McpToolBridge {
    /// Create a new bridge for a specific MCP tool
    pub fn new(transport: Arc<dyn McpTransport>, spec: McpToolSpec) -> Self {
        McpToolBridge { transport, spec }
    }

    /// Create bridges for all tools advertised by a server
    pub async fn from_server(transport: Arc<dyn McpTransport>) -> Result<Vec<Self>> {
        let specs = transport.list_tools().await?;
        Ok(specs
            .into_iter()
            .map(|spec| McpToolBridge::new(Arc::clone(&transport), spec))
            .collect())
    }
}

#[async_trait]
impl Tool for McpToolBridge {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters_schema(&self) -> Value {
        if self.spec.input_schema.is_null() {
            serde_json::json!({"type": "object", "properties": {}})
        } else {
            self.spec.input_schema.clone()
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        match self.transport.call_tool(&self.spec.name, args).await {
            Ok(result) if result.is_error => Ok(ToolResult::failure(result.text)),
            Ok(result) => Ok(ToolResult::success(result.text)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(ToolResult::failure(format!(
                "MCP tool '{}' failed: {}",
                self.spec.name, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTransport;

    #[async_trait]
    impl McpTransport for FakeTransport {
        async fn list_tools(&self) -> Result<Vec<McpToolSpec>> {
            Ok(vec![McpToolSpec {
                name: "lookup_ticket".into(),
                description: "Looks up a ticket".into(),
                input_schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}}),
            }])
        }

        async fn call_tool(&self, name: &str, args: Value) -> Result<McpCallResult> {
            Ok(McpCallResult {
                text: format!("{}({})", name, args),
                is_error: false,
            })
        }
    }

    #[tokio::test]
    async fn bridges_every_server_tool() {
        let bridges = McpToolBridge::from_server(Arc::new(FakeTransport)).await.unwrap();
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].name(), "lookup_ticket");

        let result = bridges[0]
            .execute(serde_json::json!({"id": "T-1"}))
            .await
            .unwrap();
        assert!(result.success);
    }
}
