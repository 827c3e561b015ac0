//! # TestPilot
//!
//! An autonomous test-execution agent engine. TestPilot turns a high-level
//! Gherkin/BDD instruction into a sequence of concrete actions carried out by
//! specialized navigators against external interfaces: a web browser, HTTP
//! APIs, SQL databases, security scanners, MCP servers and timers.
//!
//! ## Architecture
//!
//! - **Orchestrator** (`orchestrator`): owns the agent roster and drives one
//!   command to completion through the planner loop
//! - **Agents** (`agents`): the planner, the navigator pairs, envelope
//!   parsing and loop detection
//! - **Tools** (`tools`): the registry and the built-in tool bundles; real
//!   browsers, databases and scanners sit behind trait seams
//! - **LLM** (`llm`): the transport seam and the OpenRouter client
//! - **Memory** (`memory`): static preloaded test data and dynamic recall
//!
//! ## Design Principles
//!
//! 1. **Explicit state machines**: speaker selection is a pure function of
//!    `(last_speaker, last_message)`; no callback registrations
//! 2. **Results, not unwinding**: every tool call and planner turn returns a
//!    `Result` the orchestrator switches on
//! 3. **One session, one task**: a session runs cooperatively on a single
//!    logical task; concurrent sessions share only the read-only registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testpilot::config::OrchestratorConfig;
//! use testpilot::llm::{OpenRouterClient, OpenRouterConfig};
//! use testpilot::orchestrator::Orchestrator;
//! use testpilot::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let llm = Arc::new(OpenRouterClient::new(OpenRouterConfig {
//!         api_key: "sk-...".to_string().into(),
//!         default_model: "anthropic/claude-3.5-sonnet".to_string(),
//!         base_url: "https://openrouter.ai/api/v1".to_string(),
//!         timeout_secs: 120,
//!     })?);
//!
//!     let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
//!         .llm(llm)
//!         .build()
//!         .await?;
//!
//!     let result = orchestrator
//!         .process_command("Open https://example.com and confirm the title", None)
//!         .await?;
//!     println!("{}", result.final_response);
//!     Ok(())
//! }
//! ```

// Agents: planner, navigators, envelope parsing, loop detection
pub mod agents;

// Configuration surface read at orchestrator construction
pub mod config;

// Error types
pub mod error;

// LLM transport seam and OpenRouter client
pub mod llm;

// Long-term memory (static test data, dynamic recall)
pub mod memory;

// The orchestrator and its scheduler
pub mod orchestrator;

// Tool trait, registry, and built-in bundles
pub mod tools;

// Re-export commonly used items
pub use error::{Error, Result};

pub use agents::{Navigator, NavigatorTag, PlannerAgent};
pub use orchestrator::{ChatResult, Orchestrator, TerminatedReason};
pub use tools::{Tool, ToolRegistry};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
