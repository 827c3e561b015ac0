//! Group scheduler: the speaker-selection state machine
//!
//! Speaker selection is a pure function of `(last_speaker, last_message)`.
//! There are no registrations and no hidden state; the orchestrator and each
//! navigator's inner loop call [`next_speaker`] to decide who talks next.

use std::collections::BTreeSet;

use crate::agents::envelope::parse_envelope;
use crate::agents::prompts::{
    parse_target_helper, target_helper_marker, SKIP_STEP, TERMINATE_TASK,
};
use crate::agents::NavigatorTag;

/// A seat at the group chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The user proxy that opens the nested chat
    User,
    /// The planner agent
    Planner,
    /// A navigator's LLM-facing proposer
    Proposer(NavigatorTag),
    /// A navigator's tool-running executor
    Executor(NavigatorTag),
}

impl Speaker {
    /// Agent name as it appears in chat logs
    pub fn name(&self) -> String {
        match self {
            Speaker::User => "user".to_string(),
            Speaker::Planner => "planner".to_string(),
            Speaker::Proposer(tag) => tag.proposer_name(),
            Speaker::Executor(tag) => tag.executor_name(),
        }
    }
}

/// Outcome of one speaker-selection step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The nested chat is over; control returns to the outer driver
    Terminal,
    /// Hand the floor to this speaker
    To(Speaker),
}

/// Select the next speaker.
///
/// Rules, in order:
/// 1. a message carrying the termination sentinel ends the chat;
/// 2. after the user, route on the `##target_helper: <tag>##` marker;
/// 3. a proposer hands to its executor;
/// 4. an executor hands back to its proposer;
/// 5. otherwise, defensively route to the proposer whose tag prefixes the
///    speaker's name.
pub fn next_speaker(
    last_speaker: Speaker,
    last_message: &str,
    known_tags: &BTreeSet<NavigatorTag>,
) -> Transition {
    if last_message.contains(TERMINATE_TASK) {
        return Transition::Terminal;
    }

    match last_speaker {
        Speaker::User => {
            let tag = parse_target_helper(last_message).and_then(NavigatorTag::parse);
            match tag {
                Some(tag) if known_tags.contains(&tag) => Transition::To(Speaker::Proposer(tag)),
                _ => Transition::Terminal,
            }
        }
        Speaker::Proposer(tag) => Transition::To(Speaker::Executor(tag)),
        Speaker::Executor(tag) => Transition::To(Speaker::Proposer(tag)),
        other => {
            let name = other.name();
            let tag = known_tags
                .iter()
                .copied()
                .find(|t| name.starts_with(t.as_str()));
            match tag {
                Some(tag) => Transition::To(Speaker::Proposer(tag)),
                None => Transition::Terminal,
            }
        }
    }
}

/// Compose the reflection message handed to a navigator.
///
/// Parses the planner's latest envelope, takes its `next_step`, appends the
/// current URL for browser-type targets, and tags the message with the
/// target-helper marker. A turn without a next step degrades to the literal
/// skip instruction so the outer loop keeps advancing.
pub fn reflection_message(planner_message: &str, current_url: Option<&str>) -> String {
    let envelope = parse_envelope(planner_message);

    let (step, tag) = match (envelope.next_step, envelope.target_helper) {
        (Some(step), Some(tag)) => (step, tag),
        _ => return SKIP_STEP.to_string(),
    };

    let mut message = step.trim().to_string();
    if tag.is_browser_kind() {
        if let Some(url) = current_url {
            message.push(' ');
            message.push_str(url);
        }
    }
    message.push(' ');
    message.push_str(&target_helper_marker(tag.as_str()));
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> BTreeSet<NavigatorTag> {
        [
            NavigatorTag::Browser,
            NavigatorTag::Api,
            NavigatorTag::Sql,
            NavigatorTag::Sec,
            NavigatorTag::TimeKeeper,
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn sentinel_always_terminates() {
        for speaker in [
            Speaker::User,
            Speaker::Proposer(NavigatorTag::Api),
            Speaker::Executor(NavigatorTag::Api),
        ] {
            assert_eq!(
                next_speaker(speaker, "done ##TERMINATE TASK##", &known()),
                Transition::Terminal
            );
        }
    }

    #[test]
    fn user_routes_on_target_marker() {
        let transition = next_speaker(
            Speaker::User,
            "open the page ##target_helper: browser##",
            &known(),
        );
        assert_eq!(
            transition,
            Transition::To(Speaker::Proposer(NavigatorTag::Browser))
        );
    }

    #[test]
    fn user_without_marker_terminates() {
        assert_eq!(
            next_speaker(Speaker::User, "no marker", &known()),
            Transition::Terminal
        );
        assert_eq!(
            next_speaker(
                Speaker::User,
                "step ##target_helper: Not_Applicable##",
                &known()
            ),
            Transition::Terminal
        );
    }

    #[test]
    fn unknown_tag_terminates() {
        let enabled: BTreeSet<_> = [NavigatorTag::Api].into_iter().collect();
        assert_eq!(
            next_speaker(
                Speaker::User,
                "step ##target_helper: browser##",
                &enabled
            ),
            Transition::Terminal
        );
    }

    #[test]
    fn proposer_and_executor_alternate() {
        assert_eq!(
            next_speaker(Speaker::Proposer(NavigatorTag::Sql), "running", &known()),
            Transition::To(Speaker::Executor(NavigatorTag::Sql))
        );
        assert_eq!(
            next_speaker(Speaker::Executor(NavigatorTag::Sql), "rows: 3", &known()),
            Transition::To(Speaker::Proposer(NavigatorTag::Sql))
        );
    }

    #[test]
    fn planner_falls_back_to_terminal() {
        assert_eq!(
            next_speaker(Speaker::Planner, "anything", &known()),
            Transition::Terminal
        );
    }

    #[test]
    fn selection_is_pure() {
        // Same inputs, same output, ten times over.
        let message = "step ##target_helper: time_keeper##";
        let first = next_speaker(Speaker::User, message, &known());
        for _ in 0..10 {
            assert_eq!(next_speaker(Speaker::User, message, &known()), first);
        }
    }

    #[test]
    fn reflection_appends_marker_and_url() {
        let planner = r#"{"next_step": "Open the login page", "terminate": "no", "target_helper": "browser"}"#;
        let message = reflection_message(planner, Some("https://example.com"));
        assert_eq!(
            message,
            "Open the login page https://example.com ##target_helper: browser##"
        );
    }

    #[test]
    fn reflection_skips_url_for_non_browser() {
        let planner = r#"{"next_step": "query users", "terminate": "no", "target_helper": "sql"}"#;
        let message = reflection_message(planner, Some("https://example.com"));
        assert_eq!(message, "query users ##target_helper: sql##");
    }

    #[test]
    fn reflection_without_next_step_skips() {
        let planner = r#"{"terminate": "no", "target_helper": "browser"}"#;
        assert_eq!(reflection_message(planner, None), "skip this step");
    }
}
