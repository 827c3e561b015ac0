//! Time keeper tools

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// Maximum accepted wait, in seconds
const MAX_WAIT_SECS: f64 = 3600.0;

/// Pauses execution for a fixed number of seconds
pub struct WaitForDurationTool;

#[derive(Deserialize)]
struct WaitArgs {
    duration: f64,
}

#[async_trait]
impl Tool for WaitForDurationTool {
    fn name(&self) -> &str {
        "wait_for_duration"
    }

    fn description(&self) -> &str {
        "Wait for a specified number of seconds. Only accepts numeric values between 0 and 3600 seconds."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "duration": {
                    "type": "number",
                    "description": "Number of seconds to wait. Must be between 0 and 3600 seconds."
                }
            },
            "required": ["duration"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: WaitArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("wait_for_duration: {}", e)))?;

        if !args.duration.is_finite() || args.duration < 0.0 {
            return Ok(ToolResult::failure("duration must be a non-negative number"));
        }
        if args.duration > MAX_WAIT_SECS {
            return Ok(ToolResult::failure(format!(
                "duration must be at most {} seconds",
                MAX_WAIT_SECS
            )));
        }

        info!("Waiting for {} seconds", args.duration);
        tokio::time::sleep(std::time::Duration::from_secs_f64(args.duration)).await;
        Ok(ToolResult::success(format!(
            "Waited for {} seconds",
            args.duration
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waits_and_confirms() {
        let tool = WaitForDurationTool;
        let result = tool
            .execute(serde_json::json!({"duration": 0.01}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.content.unwrap().contains("Waited for"));
    }

    #[tokio::test]
    async fn rejects_out_of_range() {
        let tool = WaitForDurationTool;
        let too_long = tool
            .execute(serde_json::json!({"duration": 5000.0}))
            .await
            .unwrap();
        assert!(!too_long.success);

        let negative = tool
            .execute(serde_json::json!({"duration": -1.0}))
            .await
            .unwrap();
        assert!(!negative.success);
    }
}
