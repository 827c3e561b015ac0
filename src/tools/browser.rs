//! Browser tools
//!
//! The actual browser automation lives behind the [`BrowserDriver`] trait;
//! these tools translate LLM tool calls into driver calls and driver answers
//! into observation strings. One driver instance backs one session, and the
//! executor invokes tools strictly sequentially, so drivers see no
//! overlapping calls from a single session.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;

use super::traits::{Tool, ToolResult};

/// Which slice of the page a DOM snapshot should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomContentType {
    /// Visible text only
    TextOnly,
    /// Interactive input fields only
    InputFields,
    /// Full annotated DOM
    AllFields,
}

/// Interface to whatever drives the real browser (Playwright sidecar, CDP,
/// a fake in tests). Implementations serialize their own page access.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to a URL, wait for load plus `wait_secs`, return the landed URL
    async fn open_url(&self, url: &str, wait_secs: u64) -> Result<String>;

    /// Current URL of the active page
    async fn current_url(&self) -> Result<String>;

    /// Title of the active page
    async fn page_title(&self) -> Result<String>;

    /// Snapshot of the DOM filtered by content type
    async fn get_dom(&self, content_type: DomContentType) -> Result<String>;

    /// Click the element addressed by a selector
    async fn click(&self, selector: &str) -> Result<String>;

    /// Clear and type text into the element addressed by a selector
    async fn enter_text(&self, selector: &str, text: &str) -> Result<String>;

    /// Press a key combination like "Control+A"
    async fn press_key_combination(&self, combo: &str) -> Result<String>;

    /// Hover over the element addressed by a selector
    async fn hover(&self, selector: &str) -> Result<String>;
}

/// Ensures a URL carries a protocol, defaulting to https.
pub fn ensure_protocol(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        info!("Added 'https://' protocol to URL because it was missing: {}", url);
        format!("https://{}", url)
    }
}

/// Turns a driver answer into an observation, letting fatal errors propagate
/// to the executor.
fn observe(result: Result<String>) -> Result<ToolResult> {
    match result {
        Ok(text) => Ok(ToolResult::success(text)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Ok(ToolResult::failure(e.to_string())),
    }
}

/// Opens a URL in the browser
pub struct OpenUrlTool {
    driver: Arc<dyn BrowserDriver>,
}

impl OpenUrlTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[derive(Deserialize)]
struct OpenUrlArgs {
    url: String,
    #[serde(default = "default_wait")]
    timeout: u64,
}

fn default_wait() -> u64 {
    3
}

#[async_trait]
impl Tool for OpenUrlTool {
    fn name(&self) -> &str {
        "openurl"
    }

    fn description(&self) -> &str {
        "Opens specified URL in browser. Returns new page URL or error message."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to navigate to. Value must include the protocol (http:// or https://)."
                },
                "timeout": {
                    "type": "integer",
                    "description": "Additional wait time in seconds after initial load.",
                    "default": 3
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: OpenUrlArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("openurl: {}", e)))?;
        let url = ensure_protocol(&args.url);
        info!("Opening URL: {}", url);
        observe(self.driver.open_url(&url, args.timeout).await)
    }
}

/// Reports the current URL and page title
pub struct GetUrlTool {
    driver: Arc<dyn BrowserDriver>,
}

impl GetUrlTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Tool for GetUrlTool {
    fn name(&self) -> &str {
        "geturl"
    }

    fn description(&self) -> &str {
        "Get the current URL and title of the active page."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult> {
        let url = match self.driver.current_url().await {
            Ok(u) => u,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };
        let title = self.driver.page_title().await.unwrap_or_default();
        Ok(ToolResult::success(format!("url={} title={}", url, title)))
    }
}

/// Returns a filtered DOM snapshot
pub struct GetDomTool {
    driver: Arc<dyn BrowserDriver>,
}

impl GetDomTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[derive(Deserialize)]
struct GetDomArgs {
    content_type: DomContentType,
}

#[async_trait]
impl Tool for GetDomTool {
    fn name(&self) -> &str {
        "get_dom_with_content_type"
    }

    fn description(&self) -> &str {
        "Retrieves the DOM of the current page filtered by content type: \
         'text_only' for visible text, 'input_fields' for interactive elements, \
         'all_fields' for the full annotated DOM."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content_type": {
                    "type": "string",
                    "enum": ["text_only", "input_fields", "all_fields"]
                }
            },
            "required": ["content_type"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: GetDomArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("get_dom_with_content_type: {}", e)))?;
        observe(self.driver.get_dom(args.content_type).await)
    }
}

/// Clicks an element by selector
pub struct ClickTool {
    driver: Arc<dyn BrowserDriver>,
}

impl ClickTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[derive(Deserialize)]
struct SelectorArgs {
    selector: String,
}

#[async_trait]
impl Tool for ClickTool {
    fn name(&self) -> &str {
        "click"
    }

    fn description(&self) -> &str {
        "Clicks the element matching the given selector. Returns a confirmation or error message."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {"type": "string", "description": "Query selector of the element to click."}
            },
            "required": ["selector"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SelectorArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("click: {}", e)))?;
        observe(self.driver.click(&args.selector).await)
    }
}

/// Types text into an element by selector
pub struct EnterTextTool {
    driver: Arc<dyn BrowserDriver>,
}

impl EnterTextTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[derive(Deserialize)]
struct EnterTextArgs {
    selector: String,
    text: String,
}

#[async_trait]
impl Tool for EnterTextTool {
    fn name(&self) -> &str {
        "entertext"
    }

    fn description(&self) -> &str {
        "Clears the element matching the selector and types the given text into it."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {"type": "string"},
                "text": {"type": "string"}
            },
            "required": ["selector", "text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: EnterTextArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("entertext: {}", e)))?;
        observe(self.driver.enter_text(&args.selector, &args.text).await)
    }
}

/// Presses a key combination on the active page
pub struct PressKeyCombinationTool {
    driver: Arc<dyn BrowserDriver>,
}

impl PressKeyCombinationTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[derive(Deserialize)]
struct PressKeysArgs {
    key_combination: String,
}

#[async_trait]
impl Tool for PressKeyCombinationTool {
    fn name(&self) -> &str {
        "press_key_combination"
    }

    fn description(&self) -> &str {
        "Presses a key combination on the active page, e.g. 'Enter' or 'Control+A'."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key_combination": {"type": "string"}
            },
            "required": ["key_combination"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: PressKeysArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("press_key_combination: {}", e)))?;
        observe(self.driver.press_key_combination(&args.key_combination).await)
    }
}

/// Hovers over an element by selector
pub struct HoverTool {
    driver: Arc<dyn BrowserDriver>,
}

impl HoverTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Tool for HoverTool {
    fn name(&self) -> &str {
        "hover"
    }

    fn description(&self) -> &str {
        "Hovers over the element matching the given selector."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {"type": "string"}
            },
            "required": ["selector"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let args: SelectorArgs = serde_json::from_value(args)
            .map_err(|e| crate::Error::InvalidInput(format!("hover: {}", e)))?;
        observe(self.driver.hover(&args.selector).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_protocol_adds_https() {
        assert_eq!(ensure_protocol("example.com"), "https://example.com");
        assert_eq!(ensure_protocol("http://example.com"), "http://example.com");
        assert_eq!(ensure_protocol("https://example.com"), "https://example.com");
    }

    struct StubDriver;

    #[async_trait]
    impl BrowserDriver for StubDriver {
        async fn open_url(&self, url: &str, _wait_secs: u64) -> Result<String> {
            Ok(format!("Successfully opened URL: {}", url))
        }
        async fn current_url(&self) -> Result<String> {
            Ok("https://example.com/".into())
        }
        async fn page_title(&self) -> Result<String> {
            Ok("Example Domain".into())
        }
        async fn get_dom(&self, _content_type: DomContentType) -> Result<String> {
            Ok("<html/>".into())
        }
        async fn click(&self, selector: &str) -> Result<String> {
            Ok(format!("clicked {}", selector))
        }
        async fn enter_text(&self, _selector: &str, _text: &str) -> Result<String> {
            Ok("ok".into())
        }
        async fn press_key_combination(&self, _combo: &str) -> Result<String> {
            Ok("ok".into())
        }
        async fn hover(&self, _selector: &str) -> Result<String> {
            Ok("ok".into())
        }
    }

    #[tokio::test]
    async fn openurl_fills_in_protocol() {
        let tool = OpenUrlTool::new(Arc::new(StubDriver));
        let result = tool
            .execute(serde_json::json!({"url": "example.com"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.content.unwrap().contains("https://example.com"));
    }

    #[tokio::test]
    async fn geturl_reports_url_and_title() {
        let tool = GetUrlTool::new(Arc::new(StubDriver));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        let text = result.content.unwrap();
        assert!(text.contains("https://example.com/"));
        assert!(text.contains("Example Domain"));
    }

    #[tokio::test]
    async fn dom_content_type_is_validated() {
        let tool = GetDomTool::new(Arc::new(StubDriver));
        let err = tool
            .execute(serde_json::json!({"content_type": "everything"}))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
    }
}
