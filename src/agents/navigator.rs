//! Navigator pairs
//!
//! Each navigator tag is served by two cooperating agents: an LLM-backed
//! *proposer* that decides what to do, and a non-LLM *executor* that runs
//! proposed tool calls against the registry, strictly one at a time. The
//! inner dialogue between them is driven by the group scheduler's transition
//! function and is bounded by the per-navigator turn budget and the loop
//! detector.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{GenerationOptions, LlmClient, Message, Usage};
use crate::orchestrator::scheduler::{next_speaker, Speaker, Transition};
use crate::tools::{BrowserDriver, ToolCall, ToolRegistry};

use super::loop_detect::is_stuck_in_loop;
use super::prompts::{build_system_prompt, default_prompt_for, SAVE_IN_MEM, TERMINATE_TASK};
use super::NavigatorTag;

/// Placeholder returned when a subtask produced no usable output
pub const EMPTY_SUMMARY_PLACEHOLDER: &str =
    "I received an empty message. This is not an error and is recoverable. Try to reformulate the task...";

/// Executor's reply to free text that lacks the termination sentinel
const CONTINUE_NUDGE: &str = "The step is not finished. Continue with the next tool call, \
     or finish with the termination sentinel from your instructions.";

/// Why an inner dialogue ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    /// Proposer finished the step (or the chat went terminal without output)
    Completed,
    /// Loop detector flagged repeated no-progress tool calls
    Stuck,
    /// Per-navigator turn budget exhausted
    BudgetExhausted,
}

/// Outcome of one navigator subtask
#[derive(Debug)]
pub struct NavigatorRun {
    /// Summary handed back to the planner
    pub summary: String,
    /// How the dialogue ended
    pub reason: RunReason,
    /// Proposer messages spent
    pub proposer_turns: u32,
    /// Tool calls executed
    pub tool_calls: u64,
    /// Token usage across proposer turns
    pub usage: Usage,
    /// Full inner history, for chat logs
    pub history: Vec<Message>,
    /// Whether the summary carried the save-to-memory flag
    pub save_in_mem: bool,
}

/// One navigator: proposer + executor + tool bindings
pub struct Navigator {
    tag: NavigatorTag,
    system_prompt: String,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    /// Browser-type navigators append the live URL to their summaries
    url_source: Option<Arc<dyn BrowserDriver>>,
    max_turns: u32,
    options: GenerationOptions,
}

impl Navigator {
    pub fn new(
        tag: NavigatorTag,
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        system_prompt: Option<&str>,
        test_information: Option<&str>,
        max_turns: u32,
        options: GenerationOptions,
    ) -> Self {
        let base = system_prompt.unwrap_or_else(|| default_prompt_for(tag));
        let system_prompt = build_system_prompt(base, test_information, Utc::now());

        Navigator {
            tag,
            system_prompt,
            llm,
            registry,
            url_source: None,
            max_turns,
            options,
        }
    }

    /// Attach the browser driver used to report the live URL in summaries
    pub fn with_url_source(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.url_source = Some(driver);
        self
    }

    pub fn tag(&self) -> NavigatorTag {
        self.tag
    }

    /// Run one planner-assigned step to completion.
    ///
    /// `reflection` is the outer driver's composed message (next step, URL,
    /// target marker). Errors are local to the executor except fatal ones,
    /// which propagate and end the session.
    pub async fn run_subtask(
        &self,
        reflection: &str,
        known_tags: &BTreeSet<NavigatorTag>,
    ) -> Result<NavigatorRun> {
        let mut history = vec![Message::user(reflection).named("user")];
        let mut speaker = Speaker::User;
        let mut last_content = reflection.to_string();
        let mut proposer_turns: u32 = 0;
        let mut tool_calls: u64 = 0;
        let mut usage = Usage::default();

        let reason = loop {
            match next_speaker(speaker, &last_content, known_tags) {
                Transition::Terminal => break RunReason::Completed,

                Transition::To(Speaker::Proposer(tag)) => {
                    if proposer_turns >= self.max_turns {
                        warn!(
                            "Navigator '{}' hit its turn budget of {}",
                            self.tag, self.max_turns
                        );
                        break RunReason::BudgetExhausted;
                    }
                    proposer_turns += 1;

                    let message = self.propose(&history, &mut usage).await?;
                    last_content = message.content.clone();
                    history.push(message);
                    speaker = Speaker::Proposer(tag);
                }

                Transition::To(Speaker::Executor(tag)) => {
                    let proposal = history
                        .last()
                        .cloned()
                        .unwrap_or_else(|| Message::assistant(""));

                    if proposal.has_tool_calls() {
                        if is_stuck_in_loop(&history) {
                            warn!(
                                "Navigator '{}' is stuck repeating a tool call, aborting step",
                                self.tag
                            );
                            break RunReason::Stuck;
                        }
                        // Strictly sequential: each call completes and its
                        // observation lands in history before the next starts.
                        for call in proposal.tool_calls.as_deref().unwrap_or(&[]) {
                            tool_calls += 1;
                            let observation = self.execute_call(call).await?;
                            last_content = observation.clone();
                            history.push(
                                Message::tool(&call.id, observation)
                                    .named(self.tag.executor_name()),
                            );
                        }
                    } else {
                        // Free text without the sentinel: re-invoke the proposer.
                        last_content = CONTINUE_NUDGE.to_string();
                        history.push(
                            Message::user(CONTINUE_NUDGE).named(self.tag.executor_name()),
                        );
                    }
                    speaker = Speaker::Executor(tag);
                }

                // The scheduler never routes an inner chat to the user or
                // planner seats; treat it as terminal if it ever does.
                Transition::To(_) => break RunReason::Completed,
            }
        };

        let (summary, save_in_mem) = match reason {
            RunReason::Completed => self.completed_summary(&history).await,
            RunReason::Stuck => (
                format!(
                    "The {} helper repeated the same tool call with no progress and the step was aborted. \
                     Revise the approach before retrying this step.",
                    self.tag
                ),
                false,
            ),
            RunReason::BudgetExhausted => (
                format!(
                    "The {} helper exhausted its {} turns without completing the step.",
                    self.tag, self.max_turns
                ),
                false,
            ),
        };

        info!(
            "Navigator '{}' finished: reason={:?}, proposer_turns={}, tool_calls={}",
            self.tag, reason, proposer_turns, tool_calls
        );

        Ok(NavigatorRun {
            summary,
            reason,
            proposer_turns,
            tool_calls,
            usage,
            history,
            save_in_mem,
        })
    }

    /// One proposer turn: LLM round-trip with bounded retry on transient
    /// failures. Tool definitions are advertised when the registry has any
    /// for this tag.
    async fn propose(&self, history: &[Message], usage: &mut Usage) -> Result<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(&self.system_prompt));
        messages.extend_from_slice(history);

        let definitions = self.registry.definitions_for(self.tag);

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let response = backoff::future::retry(policy, || async {
            let result = if definitions.is_empty() {
                self.llm.chat(messages.clone(), self.options.clone()).await
            } else {
                self.llm
                    .chat_with_tools(messages.clone(), definitions.clone(), self.options.clone())
                    .await
            };
            result.map_err(|e| {
                if e.is_retryable() {
                    info!("Retrying {} proposer turn after transient error: {}", self.tag, e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await?;

        if let Some(delta) = &response.usage {
            usage.prompt_tokens += delta.prompt_tokens;
            usage.completion_tokens += delta.completion_tokens;
            usage.total_tokens += delta.total_tokens;
        }

        let message = match response.choices.into_iter().next() {
            Some(choice) => Message {
                role: crate::llm::Role::Assistant,
                content: choice.message.content,
                name: Some(self.tag.proposer_name()),
                tool_call_id: None,
                tool_calls: choice.message.tool_calls,
            },
            // An empty response reads as an empty free-text turn; the
            // executor will nudge or the budget will end the dialogue.
            None => Message::assistant("").named(self.tag.proposer_name()),
        };

        Ok(message)
    }

    /// Execute one proposed call, converting recoverable failures into
    /// observation text. Fatal errors propagate.
    async fn execute_call(
        &self,
        call: &crate::llm::AssistantToolCall,
    ) -> Result<String> {
        let arguments: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Failed to parse tool arguments for {}: {}",
                    call.function.name, e
                );
                serde_json::json!({})
            }
        };

        info!("Executing tool: {} for '{}'", call.function.name, self.tag);
        debug!("Tool {} arguments: {}", call.function.name, call.function.arguments);

        let tool_call = ToolCall {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments,
        };

        match self.registry.execute(self.tag, &tool_call).await {
            Ok(result) => Ok(result.as_observation()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(format!("error: {}: {}", e.kind(), e)),
        }
    }

    /// Summary for a normally-completed dialogue, per the extraction
    /// contract: sentinel stripped, URL appended for browser navigators,
    /// placeholder on empty output.
    async fn completed_summary(&self, history: &[Message]) -> (String, bool) {
        let proposer_name = self.tag.proposer_name();
        let last = history
            .iter()
            .rev()
            .find(|m| m.name.as_deref() == Some(proposer_name.as_str()))
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let url = match &self.url_source {
            Some(driver) if self.tag.is_browser_kind() => driver.current_url().await.ok(),
            _ => None,
        };

        summarize(last, url.as_deref())
    }
}

/// Pure summary extraction: strips markers, appends the URL, substitutes the
/// recoverable placeholder for empty output. Returns the summary and whether
/// the save-to-memory flag was present.
pub fn summarize(last_message: &str, current_url: Option<&str>) -> (String, bool) {
    if last_message.trim().is_empty() {
        return (EMPTY_SUMMARY_PLACEHOLDER.to_string(), false);
    }

    let save_in_mem = last_message.contains(SAVE_IN_MEM);
    let stripped = last_message
        .replace(TERMINATE_TASK, "")
        .replace(SAVE_IN_MEM, "");
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return (EMPTY_SUMMARY_PLACEHOLDER.to_string(), save_in_mem);
    }

    let summary = match current_url {
        Some(url) => format!("{} {}", stripped, url),
        None => stripped.to_string(),
    };

    (summary, save_in_mem)
}
