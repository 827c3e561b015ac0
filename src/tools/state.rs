//! Run-scoped state handoff between navigators
//!
//! Navigators are stateless across subtasks; anything one step needs to hand
//! to a later step goes through this append-only string, which is also what
//! the orchestrator folds navigator summaries into.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// Append-only context accumulated over one command run
#[derive(Clone, Default, Debug)]
pub struct RunState {
    inner: Arc<Mutex<String>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to the run context
    pub fn append(&self, text: &str) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.push_str(text);
        debug!("Run state appended, new length: {}", state.len());
    }

    /// Current contents of the run context
    pub fn snapshot(&self) -> String {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

/// Stores information for use by later steps
pub struct StoreDataTool {
    state: RunState,
}

impl StoreDataTool {
    pub fn new(state: RunState) -> Self {
        Self { state }
    }
}

#[derive(Deserialize)]
struct StoreDataArgs {
    text: String,
}

#[async_trait]
impl Tool for StoreDataTool {
    fn name(&self) -> &str {
        "store_data"
    }

    fn description(&self) -> &str {
        "Tool to store information for use by later steps."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "The text to store."}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: StoreDataArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("store_data: {}", e)))?;
        self.state.append(&args.text);
        Ok(ToolResult::success("Text appended successfully."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_data_appends() {
        let state = RunState::new();
        let tool = StoreDataTool::new(state.clone());

        tool.execute(serde_json::json!({"text": "order id 42. "}))
            .await
            .unwrap();
        tool.execute(serde_json::json!({"text": "user bob."}))
            .await
            .unwrap();

        assert_eq!(state.snapshot(), "order id 42. user bob.");
    }
}
