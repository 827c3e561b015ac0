//! Planner envelope and its parser
//!
//! Every planner turn must yield an envelope. LLMs being LLMs, the content
//! arrives as clean JSON, fenced JSON, or prose that merely resembles JSON;
//! the parser degrades through those shapes and, as a last resort, returns a
//! terminating envelope carrying the raw message so the session always ends
//! in a well-formed state.

use serde_json::Value;
use tracing::warn;

use super::NavigatorTag;

/// Planner's termination verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminate {
    Yes,
    No,
}

impl Terminate {
    /// Normalize free-form terminate values: any value containing "yes"
    /// terminates.
    fn from_text(s: &str) -> Self {
        if s.to_lowercase().contains("yes") {
            Terminate::Yes
        } else {
            Terminate::No
        }
    }
}

/// How the envelope was recovered from the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOrigin {
    /// Clean structured parse
    Json,
    /// Keyword-anchored slicing of malformed output
    KeywordFallback,
    /// No anchors found; defensive termination carrying the raw message
    Defensive,
}

/// Structured output of one planner turn
#[derive(Debug, Clone)]
pub struct PlannerEnvelope {
    /// Step-by-step plan (present on the first turn and when revised)
    pub plan: Option<String>,
    /// Single atomic instruction for one navigator
    pub next_step: Option<String>,
    /// Whether the session should end after this turn
    pub terminate: Terminate,
    /// User-visible outcome, present when terminating
    pub final_response: Option<String>,
    /// Whether this step is an assertion
    pub is_assert: bool,
    /// EXPECTED/ACTUAL text, required when `is_assert`
    pub assert_summary: Option<String>,
    /// Assertion outcome
    pub is_passed: Option<bool>,
    /// Declared navigator target; `None` means Not_Applicable or unknown
    pub target_helper: Option<NavigatorTag>,
    /// How this envelope was recovered
    pub origin: ParseOrigin,
}

impl PlannerEnvelope {
    /// Defensive envelope used when a message yields no anchors at all
    fn defensive(raw: &str) -> Self {
        PlannerEnvelope {
            plan: None,
            next_step: None,
            terminate: Terminate::Yes,
            final_response: Some(raw.to_string()),
            is_assert: false,
            assert_summary: None,
            is_passed: None,
            target_helper: None,
            origin: ParseOrigin::Defensive,
        }
    }
}

/// Strip code fences and normalize whitespace the way planner output needs
fn normalize(message: &str) -> String {
    let mut text = message.trim();

    let extracted;
    if let Some(start) = text.find("```json") {
        let inner_start = start + "```json".len();
        let inner = &text[inner_start..];
        extracted = match inner.find("```") {
            Some(end) => inner[..end].to_string(),
            None => inner.to_string(),
        };
        text = &extracted;
    } else {
        let mut stripped = text;
        if let Some(rest) = stripped.strip_prefix("```") {
            stripped = rest;
        }
        if let Some(rest) = stripped.strip_suffix("```") {
            stripped = rest;
        }
        let trimmed = stripped.trim_start();
        if let Some(rest) = trimmed.strip_prefix("json") {
            stripped = rest;
        }
        extracted = stripped.to_string();
        text = &extracted;
    }

    text.trim().replace("\\n", "\n").replace('\n', " ")
}

/// Coerce a JSON value to text: strings pass through, arrays of steps join,
/// everything else renders compactly.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn text_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).map(value_to_text).filter(|s| !s.trim().is_empty())
}

/// Coerce booleans that may arrive as strings ("true"/"yes")
fn bool_field(obj: &Value, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => {
            let lower = s.to_lowercase();
            Some(lower.contains("true") || lower.contains("yes"))
        }
        _ => None,
    }
}

fn envelope_from_json(obj: &Value) -> PlannerEnvelope {
    let terminate = text_field(obj, "terminate")
        .map(|s| Terminate::from_text(&s))
        .unwrap_or(Terminate::No);

    let target_helper = text_field(obj, "target_helper").and_then(|s| NavigatorTag::parse(&s));

    PlannerEnvelope {
        plan: text_field(obj, "plan"),
        next_step: text_field(obj, "next_step"),
        terminate,
        final_response: text_field(obj, "final_response"),
        is_assert: bool_field(obj, "is_assert").unwrap_or(false),
        assert_summary: text_field(obj, "assert_summary"),
        is_passed: bool_field(obj, "is_passed"),
        target_helper,
        origin: ParseOrigin::Json,
    }
}

/// Extract the text between two keyword anchors, with quote stripping
fn slice_between(message: &str, start_key: &str, end_key: Option<&str>) -> Option<String> {
    let start = message.find(start_key)? + start_key.len();
    let end = match end_key {
        Some(key) => message[start..].find(key).map(|i| start + i)?,
        None => message.len().saturating_sub(1).max(start),
    };
    let value = message[start..end]
        .replace('"', "")
        .trim()
        .trim_start_matches(':')
        .trim()
        .trim_end_matches(',')
        .trim()
        .to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Keyword-anchored recovery for malformed planner output
fn envelope_from_keywords(message: &str) -> Option<PlannerEnvelope> {
    let has_plan = message.contains("plan");
    let has_next = message.contains("next_step");
    let has_term = message.contains("terminate");
    let has_final = message.contains("final_response");

    if !(has_plan || has_next || has_term || has_final) {
        return None;
    }

    let plan = if has_plan && has_next {
        slice_between(message, "plan", Some("next_step"))
    } else {
        None
    };
    let next_step = if has_next && has_term {
        slice_between(message, "next_step", Some("terminate"))
    } else {
        None
    };

    let (terminate, final_response) = if has_term && has_final {
        let verdict = slice_between(message, "terminate", Some("final_response"))
            .map(|s| Terminate::from_text(&s))
            .unwrap_or(Terminate::No);
        let response = slice_between(message, "final_response", None);
        (verdict, response)
    } else if has_term {
        let verdict = slice_between(message, "terminate", None)
            .map(|s| Terminate::from_text(&s))
            .unwrap_or(Terminate::No);
        (verdict, None)
    } else {
        (Terminate::No, None)
    };

    let target_helper = slice_between(message, "target_helper", None)
        .and_then(|s| NavigatorTag::parse(&s));

    Some(PlannerEnvelope {
        plan,
        next_step,
        terminate,
        final_response,
        is_assert: false,
        assert_summary: None,
        is_passed: None,
        target_helper,
        origin: ParseOrigin::KeywordFallback,
    })
}

/// Parse a planner message into an envelope.
///
/// Never fails: when the message carries none of the anchor keywords, the
/// result is a terminating envelope whose `final_response` is the raw
/// message.
pub fn parse_envelope(message: &str) -> PlannerEnvelope {
    let normalized = normalize(message);

    match serde_json::from_str::<Value>(&normalized) {
        Ok(value) if value.is_object() => envelope_from_json(&value),
        _ => {
            warn!(
                "Planner response was not well-formed JSON, using keyword recovery: \"{}\"",
                &normalized[..normalized.len().min(200)]
            );
            envelope_from_keywords(&normalized)
                .unwrap_or_else(|| PlannerEnvelope::defensive(message))
        }
    }
}
