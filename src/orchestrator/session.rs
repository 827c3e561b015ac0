//! Per-command session state
//!
//! The orchestrator exclusively owns one [`Session`] per `process_command`
//! call. Histories are appended monotonically and never rewritten; the
//! session dies with the call, surviving only as the returned chat log.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::agents::NavigatorTag;
use crate::llm::Message;
use crate::tools::RunState;

/// Mutable state of one command run
#[derive(Debug)]
pub struct Session {
    /// Session id, used to key persisted artifacts
    pub id: Uuid,
    /// The user's command, verbatim
    pub command: String,
    /// Last known page URL, threaded into browser reflections and summaries
    pub current_url: Option<String>,
    /// Planner-side conversation
    pub planner_history: Vec<Message>,
    /// Inner dialogues, per navigator; never shared across navigators
    pub navigator_histories: BTreeMap<NavigatorTag, Vec<Message>>,
    /// Proposer turns spent per navigator
    pub turn_counters: BTreeMap<NavigatorTag, u32>,
    /// Accumulated cross-step context (`store_data` tool and step summaries)
    pub run_state: RunState,
}

impl Session {
    pub fn new(command: &str, current_url: Option<&str>, run_state: RunState) -> Self {
        Session {
            id: Uuid::new_v4(),
            command: command.to_string(),
            current_url: current_url.map(str::to_string),
            planner_history: Vec::new(),
            navigator_histories: BTreeMap::new(),
            turn_counters: BTreeMap::new(),
            run_state,
        }
    }

    /// Fold one navigator run into the session
    pub fn record_navigator_run(
        &mut self,
        tag: NavigatorTag,
        history: Vec<Message>,
        proposer_turns: u32,
    ) {
        self.navigator_histories.entry(tag).or_default().extend(history);
        *self.turn_counters.entry(tag).or_insert(0) += proposer_turns;
    }

    /// Flatten planner and navigator histories into one debugging chat log,
    /// planner first, then navigators in tag order.
    pub fn chat_log(&self) -> Vec<Message> {
        let mut log = self.planner_history.clone();
        for history in self.navigator_histories.values() {
            log.extend(history.iter().cloned());
        }
        log
    }
}
