//! Orchestrator configuration surface
//!
//! Plain serde-deserializable structs with workable defaults. How they get
//! populated (env vars, JSON files, provider resolution) is the caller's
//! concern; the orchestrator only reads them at construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::agents::NavigatorTag;
use crate::llm::GenerationOptions;
use crate::memory::MemoryMode;

/// Default outer cap on planner rounds
pub const DEFAULT_PLANNER_MAX_ROUNDS: u32 = 100;

/// Default inner cap on proposer turns per navigator dialogue
pub const DEFAULT_NAVIGATOR_MAX_ROUNDS: u32 = 20;

/// Per-agent LLM settings. `extra` is an opaque blob forwarded to the
/// transport layer untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentLlmConfig {
    /// Override for the built-in system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Generation options for this agent's turns
    #[serde(default)]
    pub options: GenerationOptions,
    /// Provider-specific settings, passed through verbatim
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Everything the orchestrator reads at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Outer cap on planner turns per command
    #[serde(default = "default_planner_rounds")]
    pub planner_max_rounds: u32,
    /// Inner cap on proposer turns per navigator dialogue
    #[serde(default = "default_navigator_rounds")]
    pub navigator_max_rounds: u32,
    /// Which navigators this deployment enables
    #[serde(default = "default_navigators")]
    pub enabled_navigators: Vec<NavigatorTag>,
    /// Static or dynamic long-term memory
    #[serde(default)]
    pub memory_mode: MemoryMode,
    /// Directory of test-data files preloaded into static memory
    #[serde(default)]
    pub test_data_dir: Option<PathBuf>,
    /// Planner LLM settings
    #[serde(default = "default_planner_llm")]
    pub planner: AgentLlmConfig,
    /// Navigator LLM settings (shared by all navigators)
    #[serde(default = "default_navigator_llm")]
    pub navigator: AgentLlmConfig,
}

fn default_planner_rounds() -> u32 {
    DEFAULT_PLANNER_MAX_ROUNDS
}

fn default_navigator_rounds() -> u32 {
    DEFAULT_NAVIGATOR_MAX_ROUNDS
}

fn default_navigators() -> Vec<NavigatorTag> {
    vec![
        NavigatorTag::Browser,
        NavigatorTag::Api,
        NavigatorTag::Sql,
        NavigatorTag::Sec,
        NavigatorTag::TimeKeeper,
    ]
}

fn default_planner_llm() -> AgentLlmConfig {
    AgentLlmConfig {
        options: GenerationOptions::precise(),
        ..Default::default()
    }
}

fn default_navigator_llm() -> AgentLlmConfig {
    AgentLlmConfig {
        options: GenerationOptions::balanced(),
        ..Default::default()
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            planner_max_rounds: default_planner_rounds(),
            navigator_max_rounds: default_navigator_rounds(),
            enabled_navigators: default_navigators(),
            memory_mode: MemoryMode::default(),
            test_data_dir: None,
            planner: default_planner_llm(),
            navigator: default_navigator_llm(),
        }
    }
}
