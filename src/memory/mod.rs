//! Long-term memory for test runs
//!
//! Two modes, chosen at orchestrator construction:
//!
//! - **Static**: a preloaded blob of test data substituted into system
//!   prompts at agent construction; immutable per command.
//! - **Dynamic**: a retrieval store queried on demand and fed with navigator
//!   summaries that carry the save-to-memory flag. The backing store (vector
//!   database, embedding model) is an external collaborator behind
//!   [`RecallStore`]; the in-process [`KeywordRecall`] serves tests and small
//!   runs.

mod dynamic_ltm;
mod static_ltm;

pub use dynamic_ltm::{KeywordRecall, RecallStore};
pub use static_ltm::StaticMemory;

use serde::{Deserialize, Serialize};

/// Which memory mode a session runs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// Preloaded test data in system prompts
    #[default]
    Static,
    /// Retrieval store queried during execution
    Dynamic,
}
