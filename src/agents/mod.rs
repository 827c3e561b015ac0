//! Agents: the planner, the navigator pairs, and their shared plumbing
//!
//! A *navigator pair* is an LLM-backed proposer plus a non-LLM executor that
//! runs proposed tool calls against the registry. The planner directs; it
//! never touches tools itself.

pub mod envelope;
pub mod loop_detect;
pub mod navigator;
pub mod planner;
pub mod prompts;

pub use envelope::{parse_envelope, PlannerEnvelope, Terminate};
pub use loop_detect::is_stuck_in_loop;
pub use navigator::{Navigator, NavigatorRun, RunReason};
pub use planner::{PlannerAgent, PlannerTurn};

use serde::{Deserialize, Serialize};

/// Identity of a domain-specific worker.
///
/// The string forms are wire-level: they appear inside
/// `##target_helper: <tag>##` markers and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigatorTag {
    Browser,
    Api,
    Sql,
    Sec,
    TimeKeeper,
    Mcp,
    Composio,
    Executor,
}

impl NavigatorTag {
    /// Every known tag, in a stable order.
    pub const ALL: [NavigatorTag; 8] = [
        NavigatorTag::Browser,
        NavigatorTag::Api,
        NavigatorTag::Sql,
        NavigatorTag::Sec,
        NavigatorTag::TimeKeeper,
        NavigatorTag::Mcp,
        NavigatorTag::Composio,
        NavigatorTag::Executor,
    ];

    /// Wire-level string form
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigatorTag::Browser => "browser",
            NavigatorTag::Api => "api",
            NavigatorTag::Sql => "sql",
            NavigatorTag::Sec => "sec",
            NavigatorTag::TimeKeeper => "time_keeper",
            NavigatorTag::Mcp => "mcp",
            NavigatorTag::Composio => "composio",
            NavigatorTag::Executor => "executor",
        }
    }

    /// Parse a planner-declared `target_helper` value. `Not_Applicable` and
    /// unknown values return `None`.
    pub fn parse(s: &str) -> Option<NavigatorTag> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s.trim())
    }

    /// Proposer agent name as it appears in chat logs
    pub fn proposer_name(&self) -> String {
        format!("{}_nav_agent", self.as_str())
    }

    /// Executor agent name as it appears in chat logs
    pub fn executor_name(&self) -> String {
        format!("{}_nav_executor", self.as_str())
    }

    /// Browser-type navigators get the current URL appended to reflection
    /// messages and summaries.
    pub fn is_browser_kind(&self) -> bool {
        matches!(self, NavigatorTag::Browser)
    }
}

impl std::fmt::Display for NavigatorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NavigatorTag {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NavigatorTag::parse(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown navigator tag: {}", s)))
    }
}
