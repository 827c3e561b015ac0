//! Tool registry: navigator tag -> ordered tool descriptors
//!
//! Registration happens at orchestrator construction; the registry is shared
//! read-only (behind an `Arc`) once dispatch begins. There are no concurrency
//! guarantees during mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::agents::NavigatorTag;
use crate::error::{Error, Result};
use crate::llm::types::ToolDefinition;

use super::traits::{Tool, ToolCall, ToolResult};

/// Registry of tools, partitioned by navigator visibility
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<NavigatorTag, Vec<Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool for every tag in `visibility`.
    ///
    /// Fails with [`Error::DuplicateTool`] if the same (tag, name) pair is
    /// already present.
    pub fn register(&mut self, tool: Arc<dyn Tool>, visibility: &[NavigatorTag]) -> Result<()> {
        for tag in visibility {
            let entry = self.tools.entry(*tag).or_default();
            if entry.iter().any(|t| t.name() == tool.name()) {
                return Err(Error::DuplicateTool {
                    tag: tag.to_string(),
                    name: tool.name().to_string(),
                });
            }
            debug!("Registered tool '{}' for navigator '{}'", tool.name(), tag);
            entry.push(Arc::clone(&tool));
        }
        Ok(())
    }

    /// Tools visible to a navigator, in registration order
    pub fn list_for(&self, tag: NavigatorTag) -> &[Arc<dyn Tool>] {
        self.tools.get(&tag).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Wire-level definitions advertised to a navigator's proposer
    pub fn definitions_for(&self, tag: NavigatorTag) -> Vec<ToolDefinition> {
        self.list_for(tag).iter().map(|t| t.to_definition()).collect()
    }

    /// Resolve a tool by name within a navigator's visibility set
    pub fn resolve(&self, tag: NavigatorTag, name: &str) -> Result<Arc<dyn Tool>> {
        self.list_for(tag)
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| Error::ToolNotFound {
                tag: tag.to_string(),
                name: name.to_string(),
            })
    }

    /// Execute a tool call on behalf of a navigator.
    ///
    /// Visibility misses come back as `Err(ToolNotFound)` so the executor can
    /// turn them into an observation instead of aborting.
    pub async fn execute(&self, tag: NavigatorTag, call: &ToolCall) -> Result<ToolResult> {
        let tool = self.resolve(tag, &call.name)?;
        tool.execute(call.arguments.clone()).await
    }

    /// Total number of (tag, tool) registrations
    pub fn count(&self) -> usize {
        self.tools.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "echoes its arguments"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, args: Value) -> crate::Result<ToolResult> {
            Ok(ToolResult::success(args.to_string()))
        }
    }

    #[test]
    fn register_then_resolve() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool("echo")), &[NavigatorTag::Api])
            .unwrap();

        let tool = registry.resolve(NavigatorTag::Api, "echo").unwrap();
        assert_eq!(tool.name(), "echo");
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool("echo")), &[NavigatorTag::Api])
            .unwrap();
        let err = registry
            .register(Arc::new(EchoTool("echo")), &[NavigatorTag::Api])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTool { .. }));
    }

    #[test]
    fn visibility_is_per_tag() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool("echo")), &[NavigatorTag::Api])
            .unwrap();

        assert!(registry.resolve(NavigatorTag::Sql, "echo").is_err());
        assert!(registry.list_for(NavigatorTag::Sql).is_empty());
    }

    #[test]
    fn registration_order_preserved() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool("first")), &[NavigatorTag::Browser])
            .unwrap();
        registry
            .register(Arc::new(EchoTool("second")), &[NavigatorTag::Browser])
            .unwrap();

        let names: Vec<_> = registry
            .list_for(NavigatorTag::Browser)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "missing".into(),
            arguments: Value::Null,
        };
        let err = registry.execute(NavigatorTag::Api, &call).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
