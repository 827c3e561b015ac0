//! Stuck-loop detection for navigator dialogues
//!
//! A navigator is stuck when its last three tool-call proposals are the same
//! call (same tool, structurally equal arguments) with nothing but executor
//! results in between. Executors use this as their termination predicate so
//! an inner dialogue cannot burn its whole round budget re-issuing one call.

use serde_json::Value;

use crate::llm::types::Message;

/// How many identical consecutive proposals count as stuck
const STUCK_THRESHOLD: usize = 3;

/// One proposal, normalized for comparison
#[derive(PartialEq)]
struct ProposalKey {
    name: String,
    arguments: ArgKey,
}

/// Arguments compare structurally when they parse as JSON, otherwise by their
/// whitespace-stripped text.
#[derive(PartialEq)]
enum ArgKey {
    Json(Value),
    Text(String),
}

fn argument_key(raw: &str) -> ArgKey {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => ArgKey::Json(value),
        Err(_) => ArgKey::Text(raw.split_whitespace().collect()),
    }
}

/// Decide whether the proposer behind `messages` is re-issuing the same tool
/// call with no observable progress.
pub fn is_stuck_in_loop(messages: &[Message]) -> bool {
    let mut proposals: Vec<ProposalKey> = Vec::new();

    for message in messages {
        if let Some(calls) = &message.tool_calls {
            for call in calls {
                proposals.push(ProposalKey {
                    name: call.function.name.clone(),
                    arguments: argument_key(&call.function.arguments),
                });
            }
        }
    }

    if proposals.len() < STUCK_THRESHOLD {
        return false;
    }

    let tail = &proposals[proposals.len() - STUCK_THRESHOLD..];
    tail.iter().all(|p| *p == tail[0])
}
