//! Tools: the operations navigators can perform
//!
//! Each tool is a self-contained struct implementing the [`Tool`] trait.
//! Tools are registered into a [`ToolRegistry`] under one or more navigator
//! tags; the executor of the matching navigator is the only caller.
//!
//! ## Built-in bundles
//!
//! - **browser**: navigation and element interaction over a [`BrowserDriver`]
//! - **api**: CRUD-shaped HTTP calls
//! - **sql**: read-only queries over a [`SqlBackend`]
//! - **sec**: scans over a [`SecurityScanner`]
//! - **time_keeper**: static waits
//! - **store_data**: cross-step context handoff
//! - **mcp**: bridged MCP server tools
//!
//! ## Adding a new tool
//!
//! 1. Create a new file in `src/tools/` and implement the `Tool` trait
//! 2. Register it (with its visibility tags) before the orchestrator starts
//!    dispatching; registration is rejected once shared

mod api;
mod browser;
mod mcp;
mod registry;
mod sec;
mod sql;
mod state;
mod timer;
mod traits;

pub use api::{
    CreateResourceTool, DeleteResourceTool, PatchResourceTool, ReadResourceTool,
    UpdateResourceTool,
};
pub use browser::{
    ensure_protocol, BrowserDriver, ClickTool, DomContentType, EnterTextTool, GetDomTool,
    GetUrlTool, HoverTool, OpenUrlTool, PressKeyCombinationTool,
};
pub use mcp::{McpCallResult, McpToolBridge, McpToolSpec, McpTransport};
pub use registry::ToolRegistry;
pub use sec::{SecurityScanTool, SecurityScanner};
pub use sql::{ExecuteSelectQueryTool, ListTablesTool, SqlBackend};
pub use state::{RunState, StoreDataTool};
pub use timer::WaitForDurationTool;
pub use traits::{Tool, ToolCall, ToolResult};

use std::sync::Arc;

use crate::agents::NavigatorTag;
use crate::error::Result;

/// External resources the built-in tool bundles delegate to.
///
/// Absent resources simply leave the corresponding bundle unregistered; the
/// navigator tag can still be enabled with caller-registered tools.
#[derive(Default)]
pub struct ToolDeps {
    /// Browser automation backend
    pub browser: Option<Arc<dyn BrowserDriver>>,
    /// Database backend
    pub sql: Option<Arc<dyn SqlBackend>>,
    /// Security scanner backend
    pub scanner: Option<Arc<dyn SecurityScanner>>,
    /// MCP server connections
    pub mcp: Vec<Arc<dyn McpTransport>>,
}

/// Register the built-in tool bundles for the resources present in `deps`.
///
/// `run_state` is the session's accumulated context; the `store_data` tool
/// writes into it.
pub async fn register_builtin_tools(
    registry: &mut ToolRegistry,
    deps: &ToolDeps,
    run_state: &RunState,
) -> Result<()> {
    let http = reqwest::Client::new();

    if let Some(driver) = &deps.browser {
        registry.register(
            Arc::new(OpenUrlTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(GetUrlTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(GetDomTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(ClickTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(EnterTextTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(PressKeyCombinationTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
        registry.register(
            Arc::new(HoverTool::new(Arc::clone(driver))),
            &[NavigatorTag::Browser],
        )?;
    }

    registry.register(
        Arc::new(CreateResourceTool::new(http.clone())),
        &[NavigatorTag::Api],
    )?;
    registry.register(
        Arc::new(ReadResourceTool::new(http.clone())),
        &[NavigatorTag::Api],
    )?;
    registry.register(
        Arc::new(UpdateResourceTool::new(http.clone())),
        &[NavigatorTag::Api],
    )?;
    registry.register(
        Arc::new(PatchResourceTool::new(http.clone())),
        &[NavigatorTag::Api],
    )?;
    registry.register(
        Arc::new(DeleteResourceTool::new(http)),
        &[NavigatorTag::Api],
    )?;

    if let Some(backend) = &deps.sql {
        registry.register(
            Arc::new(ExecuteSelectQueryTool::new(Arc::clone(backend))),
            &[NavigatorTag::Sql],
        )?;
        registry.register(
            Arc::new(ListTablesTool::new(Arc::clone(backend))),
            &[NavigatorTag::Sql],
        )?;
    }

    if let Some(scanner) = &deps.scanner {
        registry.register(
            Arc::new(SecurityScanTool::new(Arc::clone(scanner))),
            &[NavigatorTag::Sec],
        )?;
    }

    registry.register(Arc::new(WaitForDurationTool), &[NavigatorTag::TimeKeeper])?;

    registry.register(
        Arc::new(StoreDataTool::new(run_state.clone())),
        &[NavigatorTag::Browser, NavigatorTag::Api, NavigatorTag::Sql],
    )?;

    for transport in &deps.mcp {
        for bridge in McpToolBridge::from_server(Arc::clone(transport)).await? {
            registry.register(Arc::new(bridge), &[NavigatorTag::Mcp])?;
        }
    }

    Ok(())
}
