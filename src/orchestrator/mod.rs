//! Orchestrator: runs one command to completion
//!
//! Owns the agent roster, wires the registry, planner and navigators
//! together, and drives the outer planner loop. Every exit path yields a
//! well-formed [`ChatResult`]; nothing escapes by unwinding.

pub mod scheduler;
mod session;

pub use session::Session;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::agents::envelope::{parse_envelope, ParseOrigin, Terminate};
use crate::agents::navigator::RunReason;
use crate::agents::planner::PLANNER_NAME;
use crate::agents::prompts::build_command_prompt;
use crate::agents::{Navigator, NavigatorTag, PlannerAgent};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, Message, Usage};
use crate::memory::{KeywordRecall, MemoryMode, RecallStore, StaticMemory};
use crate::tools::{
    register_builtin_tools, BrowserDriver, RunState, Tool, ToolDeps, ToolRegistry,
};

use scheduler::reflection_message;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminatedReason {
    /// Planner declared completion (including failed assertions)
    Ok,
    /// Planner named no applicable target helper while not terminating
    NoTarget,
    /// Outer planner round budget exhausted
    RoundBudget,
    /// A navigator's inner round budget exhausted
    NavBudget,
    /// Session cancelled from outside
    Cancelled,
    /// Planner output carried no recoverable envelope
    ParseError,
    /// External resource permanently unavailable
    FatalExternal,
}

/// One assertion outcome surfaced by the planner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionRecord {
    /// EXPECTED/ACTUAL text from the envelope
    pub summary: String,
    /// Whether the assertion passed
    pub passed: bool,
}

/// Aggregate cost of a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tool_calls: u64,
}

/// Result of one `process_command` call
#[derive(Debug, Clone, Serialize)]
pub struct ChatResult {
    /// User-visible outcome; never empty
    pub final_response: String,
    /// How the session ended
    pub terminated_reason: TerminatedReason,
    /// Assertion outcomes, in planner order
    pub assertions: Vec<AssertionRecord>,
    /// Token and tool-call totals
    pub cost_summary: CostSummary,
    /// Full conversation, for debugging and external reporters
    pub chat_log: Vec<Message>,
}

/// Cooperative cancellation for a running session
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Request cancellation; the session exits at its next turn boundary.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    llm: Option<Arc<dyn LlmClient>>,
    planner_llm: Option<Arc<dyn LlmClient>>,
    deps: ToolDeps,
    static_memory: StaticMemory,
    recall: Option<Arc<dyn RecallStore>>,
    extra_tools: Vec<(Arc<dyn Tool>, Vec<NavigatorTag>)>,
}

impl OrchestratorBuilder {
    /// LLM client shared by planner and navigators
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Separate LLM client for the planner only
    pub fn planner_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.planner_llm = Some(llm);
        self
    }

    /// External resources backing the built-in tool bundles
    pub fn tool_deps(mut self, deps: ToolDeps) -> Self {
        self.deps = deps;
        self
    }

    /// Preloaded static test data
    pub fn static_memory(mut self, memory: StaticMemory) -> Self {
        self.static_memory = memory;
        self
    }

    /// Retrieval store for dynamic memory mode
    pub fn recall_store(mut self, store: Arc<dyn RecallStore>) -> Self {
        self.recall = Some(store);
        self
    }

    /// Register an additional tool for the given navigators
    pub fn with_tool(mut self, tool: Arc<dyn Tool>, visibility: &[NavigatorTag]) -> Self {
        self.extra_tools.push((tool, visibility.to_vec()));
        self
    }

    /// Wire everything together. All tool registration happens here; the
    /// registry is immutable afterwards.
    pub async fn build(self) -> Result<Orchestrator> {
        let llm = self
            .llm
            .ok_or_else(|| Error::Config("an LLM client is required".to_string()))?;
        let planner_llm = self.planner_llm.unwrap_or_else(|| Arc::clone(&llm));
        let config = self.config;

        let run_state = RunState::new();

        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, &self.deps, &run_state).await?;
        for (tool, visibility) in self.extra_tools {
            registry.register(tool, &visibility)?;
        }
        let registry = Arc::new(registry);

        let static_memory = match &config.test_data_dir {
            Some(dir) if self.static_memory.get_user_ltm().is_none() => {
                StaticMemory::load_dir(dir)?
            }
            _ => self.static_memory,
        };

        // Static mode preloads test data into prompts; dynamic mode seeds the
        // recall store instead and injects on demand.
        let (test_information, recall): (Option<String>, Option<Arc<dyn RecallStore>>) =
            match config.memory_mode {
                MemoryMode::Static => (
                    static_memory.get_user_ltm().map(str::to_string),
                    None,
                ),
                MemoryMode::Dynamic => {
                    let store = match self.recall {
                        Some(store) => store,
                        None => Arc::new(KeywordRecall::with_seed(
                            static_memory.get_user_ltm().unwrap_or(""),
                        )),
                    };
                    (None, Some(store))
                }
            };

        let planner = PlannerAgent::new(
            Arc::clone(&planner_llm),
            config.planner.system_prompt.as_deref(),
            test_information.as_deref(),
            config.planner.options.clone(),
        );

        let enabled: BTreeSet<NavigatorTag> = config.enabled_navigators.iter().copied().collect();
        let mut navigators = BTreeMap::new();
        for tag in &enabled {
            let mut navigator = Navigator::new(
                *tag,
                Arc::clone(&llm),
                Arc::clone(&registry),
                config.navigator.system_prompt.as_deref(),
                test_information.as_deref(),
                config.navigator_max_rounds,
                config.navigator.options.clone(),
            );
            if tag.is_browser_kind() {
                if let Some(driver) = &self.deps.browser {
                    navigator = navigator.with_url_source(Arc::clone(driver));
                }
            }
            navigators.insert(*tag, navigator);
        }

        info!(
            "Orchestrator ready: {} navigators, {} tool registrations, memory={:?}",
            navigators.len(),
            registry.count(),
            config.memory_mode
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);

        Ok(Orchestrator {
            config,
            planner,
            navigators,
            enabled,
            browser: self.deps.browser,
            recall,
            run_state,
            fatal: AtomicBool::new(false),
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        })
    }
}

/// The agent orchestrator
pub struct Orchestrator {
    config: OrchestratorConfig,
    planner: PlannerAgent,
    navigators: BTreeMap<NavigatorTag, Navigator>,
    enabled: BTreeSet<NavigatorTag>,
    browser: Option<Arc<dyn BrowserDriver>>,
    recall: Option<Arc<dyn RecallStore>>,
    run_state: RunState,
    /// Set after a fatal external failure; the orchestrator refuses further
    /// commands and must be rebuilt.
    fatal: AtomicBool,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl Orchestrator {
    /// Start building an orchestrator
    pub fn builder(config: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            llm: None,
            planner_llm: None,
            deps: ToolDeps::default(),
            static_memory: StaticMemory::empty(),
            recall: None,
            extra_tools: Vec::new(),
        }
    }

    /// Handle for cancelling a running session from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    fn cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Run one command to completion and return its result.
    ///
    /// The whole session runs cooperatively on the calling task; the only
    /// suspension points are LLM round-trips and tool handlers.
    pub async fn process_command(
        &self,
        command: &str,
        current_url: Option<&str>,
    ) -> Result<ChatResult> {
        if self.fatal.load(Ordering::Acquire) {
            return Err(Error::FatalExternal(
                "a previous session failed fatally; build a fresh orchestrator".to_string(),
            ));
        }

        let mut session = Session::new(command, current_url, self.run_state.clone());
        let prompt = build_command_prompt(command, current_url)?;
        info!("Prompt for command: {}", prompt);
        session.planner_history.push(Message::user(&prompt).named("user"));

        let mut assertions: Vec<AssertionRecord> = Vec::new();
        let mut cost = CostSummary::default();
        let mut last_recalled = String::new();

        // Exhausting the loop without an explicit exit is the round-budget
        // outcome.
        let mut reason = TerminatedReason::RoundBudget;
        let mut final_response: Option<String> = None;

        for round in 0..self.config.planner_max_rounds {
            if self.cancelled() {
                reason = TerminatedReason::Cancelled;
                final_response = Some("Session cancelled before completion.".to_string());
                break;
            }

            self.inject_recall(&mut session, &mut last_recalled).await;

            let turn = match self.planner.next_turn(&session.planner_history).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!("Planner turn failed: {}", e);
                    self.fatal.store(true, Ordering::Release);
                    reason = TerminatedReason::FatalExternal;
                    final_response = Some(format!("Planner unavailable: {}", e));
                    break;
                }
            };
            accumulate(&mut cost, &turn.usage);
            session.planner_history.push(turn.message.clone());

            let envelope = parse_envelope(&turn.message.content);
            info!(
                "Planner round {}: terminate={:?}, target={:?}",
                round, envelope.terminate, envelope.target_helper
            );

            if envelope.is_assert {
                if let Some(summary) = &envelope.assert_summary {
                    assertions.push(AssertionRecord {
                        summary: summary.clone(),
                        passed: envelope.is_passed.unwrap_or(false),
                    });
                }
            }

            if envelope.origin == ParseOrigin::Defensive {
                reason = TerminatedReason::ParseError;
                let raw = envelope.final_response.unwrap_or_default();
                final_response = Some(if raw.trim().is_empty() {
                    "parse failure".to_string()
                } else {
                    raw
                });
                break;
            }

            if envelope.terminate == Terminate::Yes {
                reason = TerminatedReason::Ok;
                final_response = Some(
                    envelope
                        .final_response
                        .unwrap_or_else(|| "Task terminated without a final response.".to_string()),
                );
                break;
            }

            let target = envelope.target_helper.filter(|t| self.enabled.contains(t));
            let Some(tag) = target else {
                reason = TerminatedReason::NoTarget;
                final_response = Some(
                    "Planner named no applicable target helper; terminating without a result."
                        .to_string(),
                );
                break;
            };

            let reflection =
                reflection_message(&turn.message.content, session.current_url.as_deref());
            info!("Dispatching to '{}': {}", tag, reflection);

            // Roster and enabled set are built together; the lookup cannot
            // miss for an enabled tag.
            let navigator = match self.navigators.get(&tag) {
                Some(navigator) => navigator,
                None => {
                    reason = TerminatedReason::NoTarget;
                    final_response =
                        Some(format!("Navigator '{}' is not available in this deployment.", tag));
                    break;
                }
            };

            let run = match navigator.run_subtask(&reflection, &self.enabled).await {
                Ok(run) => run,
                Err(e) => {
                    warn!("Navigator '{}' failed fatally: {}", tag, e);
                    self.fatal.store(true, Ordering::Release);
                    reason = if matches!(e, Error::Cancelled) {
                        TerminatedReason::Cancelled
                    } else {
                        TerminatedReason::FatalExternal
                    };
                    final_response = Some(format!("Step against '{}' failed fatally: {}", tag, e));
                    break;
                }
            };

            accumulate(&mut cost, &run.usage);
            cost.tool_calls += run.tool_calls;
            session.record_navigator_run(tag, run.history, run.proposer_turns);

            if run.reason == RunReason::BudgetExhausted {
                reason = TerminatedReason::NavBudget;
                final_response = Some(run.summary);
                break;
            }

            self.fold_summary(&mut session, tag, &run.summary, run.save_in_mem)
                .await;

            session
                .planner_history
                .push(Message::user(&run.summary).named("user"));
        }

        if final_response.is_none() {
            final_response = Some(format!(
                "Planner round budget of {} exhausted before the task completed.",
                self.config.planner_max_rounds
            ));
        }

        let final_response = final_response.unwrap_or_else(|| "no result".to_string());
        info!(
            "Session {} finished: reason={:?}, planner_msgs={}, tool_calls={}",
            session.id,
            reason,
            session
                .planner_history
                .iter()
                .filter(|m| m.name.as_deref() == Some(PLANNER_NAME))
                .count(),
            cost.tool_calls
        );

        Ok(ChatResult {
            final_response,
            terminated_reason: reason,
            assertions,
            cost_summary: cost,
            chat_log: session.chat_log(),
        })
    }

    /// In dynamic memory mode, inject recalled context relevant to the latest
    /// planner-visible message.
    async fn inject_recall(&self, session: &mut Session, last_recalled: &mut String) {
        let Some(store) = &self.recall else { return };
        let Some(latest) = session.planner_history.last() else { return };

        match store.query(&latest.content).await {
            Ok(recalled) if !recalled.is_empty() && recalled != *last_recalled => {
                session.planner_history.push(
                    Message::user(format!("Relevant test information:\n{}", recalled))
                        .named("memory"),
                );
                *last_recalled = recalled;
            }
            Ok(_) => {}
            Err(e) => warn!("Recall query failed: {}", e),
        }
    }

    /// Post-subtask bookkeeping: memory saves, run-state context, URL refresh.
    async fn fold_summary(
        &self,
        session: &mut Session,
        tag: NavigatorTag,
        summary: &str,
        save_in_mem: bool,
    ) {
        if save_in_mem {
            if let Some(store) = &self.recall {
                if let Err(e) = store.save_content(summary).await {
                    warn!("Failed to save summary to memory: {}", e);
                }
            }
        }

        if tag.is_browser_kind() {
            if let Some(driver) = &self.browser {
                if let Ok(url) = driver.current_url().await {
                    session.current_url = Some(url);
                }
            }
        } else {
            session
                .run_state
                .append(&format!("Context from previous steps: {}\n", summary));
        }
    }
}

/// Sum a usage delta into the cost summary
fn accumulate(cost: &mut CostSummary, usage: &Usage) {
    cost.tokens_in += usage.prompt_tokens;
    cost.tokens_out += usage.completion_tokens;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated_reason_serializes_snake_case() {
        let json = serde_json::to_string(&TerminatedReason::RoundBudget).unwrap();
        assert_eq!(json, r#""round_budget""#);
        let json = serde_json::to_string(&TerminatedReason::FatalExternal).unwrap();
        assert_eq!(json, r#""fatal_external""#);
    }

    #[test]
    fn chat_result_serializes() {
        let result = ChatResult {
            final_response: "done".into(),
            terminated_reason: TerminatedReason::Ok,
            assertions: vec![AssertionRecord {
                summary: "EXPECTED RESULT: a\nACTUAL RESULT: a".into(),
                passed: true,
            }],
            cost_summary: CostSummary::default(),
            chat_log: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["terminated_reason"], "ok");
        assert_eq!(json["assertions"][0]["passed"], true);
    }
}
