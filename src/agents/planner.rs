//! Planner agent
//!
//! The planner is the only agent with a whole-task view. Its output contract
//! is the envelope; it never calls tools, it only directs navigators.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::{GenerationOptions, LlmClient, Message, Usage};

use super::prompts::{build_system_prompt, PLANNER_AGENT_PROMPT};

/// Agent name used in chat logs
pub const PLANNER_NAME: &str = "planner";

/// One planner turn: the message plus the tokens it cost
#[derive(Debug)]
pub struct PlannerTurn {
    pub message: Message,
    pub usage: Usage,
}

/// LLM-backed planner
pub struct PlannerAgent {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    options: GenerationOptions,
}

impl PlannerAgent {
    /// Create a planner.
    ///
    /// `system_prompt` overrides the built-in prompt; `test_information` is
    /// the preloaded static memory substituted into the prompt's test-data
    /// slot.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        system_prompt: Option<&str>,
        test_information: Option<&str>,
        options: GenerationOptions,
    ) -> Self {
        let base = system_prompt.unwrap_or(PLANNER_AGENT_PROMPT);
        let system_prompt = build_system_prompt(base, test_information, Utc::now());
        debug!("Planner system prompt is {} chars", system_prompt.len());

        PlannerAgent {
            llm,
            system_prompt,
            options,
        }
    }

    /// Produce the next planner message given the conversation so far.
    ///
    /// Retries transient provider failures (timeouts, rate limits) with
    /// exponential backoff before giving up.
    pub async fn next_turn(&self, history: &[Message]) -> Result<PlannerTurn> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(&self.system_prompt));
        messages.extend_from_slice(history);

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let response = backoff::future::retry(policy, || async {
            self.llm
                .chat(messages.clone(), self.options.clone())
                .await
                .map_err(|e| {
                    if e.is_retryable() {
                        info!("Retrying planner turn after transient error: {}", e);
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
        })
        .await?;

        let usage = response.usage.clone().unwrap_or_default();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("planner returned no choices".to_string()))?;

        Ok(PlannerTurn {
            message: Message::assistant(choice.message.content).named(PLANNER_NAME),
            usage,
        })
    }
}
