//! HTTP API tools
//!
//! CRUD-shaped tools over a shared reqwest client. Responses are summarized
//! for the LLM: status code, elapsed time and a bounded body excerpt, since
//! the proposer reasons about outcomes rather than raw payloads.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// Bytes of response body included in an observation
const BODY_EXCERPT_LIMIT: usize = 4000;

#[derive(Deserialize)]
struct ApiRequestArgs {
    url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    query: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default = "default_timeout_secs")]
    timeout: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

async fn perform(
    client: &reqwest::Client,
    method: Method,
    args: ApiRequestArgs,
) -> Result<ToolResult> {
    info!("HTTP {} {}", method, args.url);

    let mut request = client
        .request(method.clone(), &args.url)
        .timeout(std::time::Duration::from_secs(args.timeout))
        .query(&args.query);

    for (key, value) in &args.headers {
        request = request.header(key, value);
    }
    if let Some(body) = &args.body {
        request = request.json(body);
    }

    let started = Instant::now();
    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            // Network failures are observations, not session enders.
            return Ok(ToolResult::failure(format!(
                "request to {} failed: {}",
                args.url, e
            )));
        }
    };
    let elapsed_ms = started.elapsed().as_millis();

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(BODY_EXCERPT_LIMIT).collect();

    debug!("HTTP {} -> {} in {}ms", args.url, status, elapsed_ms);

    let summary = format!(
        "status_code: {}\nexecution_time_ms: {}\nresponse_body: {}",
        status.as_u16(),
        elapsed_ms,
        excerpt
    );

    if status.is_success() {
        Ok(ToolResult::success(summary))
    } else {
        Ok(ToolResult::failure(summary))
    }
}

fn request_schema(with_body: bool) -> Value {
    let mut properties = serde_json::json!({
        "url": {"type": "string", "description": "Fully qualified endpoint URL."},
        "headers": {"type": "object", "description": "Optional request headers.", "additionalProperties": {"type": "string"}},
        "query": {"type": "object", "description": "Optional query parameters.", "additionalProperties": {"type": "string"}},
        "timeout": {"type": "integer", "description": "Request timeout in seconds.", "default": 30}
    });
    if with_body {
        properties["body"] = serde_json::json!({
            "type": "object",
            "description": "JSON request body."
        });
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": ["url"]
    })
}

macro_rules! http_api_tool {
    ($struct_name:ident, $tool_name:literal, $method:expr, $with_body:literal, $doc:literal) => {
        #[doc = $doc]
        pub struct $struct_name {
            client: reqwest::Client,
        }

        impl $struct_name {
            pub fn new(client: reqwest::Client) -> Self {
                Self { client }
            }
        }

        #[async_trait]
        impl Tool for $struct_name {
            fn name(&self) -> &str {
                $tool_name
            }

            fn description(&self) -> &str {
                $doc
            }

            fn parameters_schema(&self) -> Value {
                request_schema($with_body)
            }

            async fn execute(&self, args: Value) -> Result<ToolResult> {
                let args: ApiRequestArgs = serde_json::from_value(args).map_err(|e| {
                    crate::Error::InvalidInput(format!("{}: {}", $tool_name, e))
                })?;
                perform(&self.client, $method, args).await
            }
        }
    };
}

http_api_tool!(
    CreateResourceTool,
    "create_resource_http_api",
    Method::POST,
    true,
    "Creates a resource with an HTTP POST request. Returns status code, execution time and response body."
);

http_api_tool!(
    ReadResourceTool,
    "read_resource_http_api",
    Method::GET,
    false,
    "Reads a resource with an HTTP GET request. Returns status code, execution time and response body."
);

http_api_tool!(
    UpdateResourceTool,
    "update_resource_http_api",
    Method::PUT,
    true,
    "Replaces a resource with an HTTP PUT request. Returns status code, execution time and response body."
);

http_api_tool!(
    PatchResourceTool,
    "patch_resource_http_api",
    Method::PATCH,
    true,
    "Partially updates a resource with an HTTP PATCH request. Returns status code, execution time and response body."
);

http_api_tool!(
    DeleteResourceTool,
    "delete_resource_http_api",
    Method::DELETE,
    false,
    "Deletes a resource with an HTTP DELETE request. Returns status code, execution time and response body."
);
