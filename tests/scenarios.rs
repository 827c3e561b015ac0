//! End-to-end orchestrator scenarios driven by a scripted LLM client.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use testpilot::agents::navigator::EMPTY_SUMMARY_PLACEHOLDER;
use testpilot::config::OrchestratorConfig;
use testpilot::llm::{
    AssistantToolCall, ChatCompletionResponse, Choice, FunctionCall, GenerationOptions,
    LlmClient, Message, ToolDefinition, Usage,
};
use testpilot::memory::RecallStore;
use testpilot::orchestrator::{Orchestrator, TerminatedReason};
use testpilot::tools::{BrowserDriver, DomContentType, ToolDeps};
use testpilot::Result;

/// LLM double that replays a fixed sequence of assistant messages and records
/// every request it served.
struct ScriptedLlm {
    script: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    fn new(script: Vec<Message>) -> Arc<Self> {
        Arc::new(ScriptedLlm {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn respond(&self, messages: Vec<Message>) -> ChatCompletionResponse {
        self.requests.lock().unwrap().push(messages);
        let message = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Message::assistant("off script ##TERMINATE TASK##"));
        ChatCompletionResponse {
            id: "gen".into(),
            model: "scripted".into(),
            choices: vec![Choice {
                message,
                finish_reason: Some("stop".into()),
            }],
            usage: Some(Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        messages: Vec<Message>,
        _options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        Ok(self.respond(messages))
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        _tools: Vec<ToolDefinition>,
        _options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        Ok(self.respond(messages))
    }
}

/// Planner envelope rendered the way a well-behaved model would
fn planner_step(next_step: &str, target: &str) -> Message {
    Message::assistant(
        serde_json::json!({
            "plan": "1. do the step",
            "next_step": next_step,
            "terminate": "no",
            "is_assert": false,
            "target_helper": target,
        })
        .to_string(),
    )
}

fn planner_done(final_response: &str) -> Message {
    Message::assistant(
        serde_json::json!({
            "terminate": "yes",
            "final_response": final_response,
            "is_assert": false,
            "target_helper": "Not_Applicable",
        })
        .to_string(),
    )
}

fn tool_call(name: &str, arguments: serde_json::Value) -> Message {
    Message {
        role: testpilot::llm::Role::Assistant,
        content: String::new(),
        name: None,
        tool_call_id: None,
        tool_calls: Some(vec![AssistantToolCall {
            id: "call_1".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }]),
    }
}

fn nav_done(text: &str) -> Message {
    Message::assistant(format!("{} ##TERMINATE TASK##", text))
}

struct FakeDriver {
    url: Mutex<String>,
}

impl FakeDriver {
    fn new() -> Arc<Self> {
        Arc::new(FakeDriver {
            url: Mutex::new("about:blank".into()),
        })
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn open_url(&self, url: &str, _wait_secs: u64) -> Result<String> {
        *self.url.lock().unwrap() = url.to_string();
        Ok(format!("Successfully opened URL: {}", url))
    }
    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }
    async fn page_title(&self) -> Result<String> {
        Ok("Example Domain".into())
    }
    async fn get_dom(&self, _content_type: DomContentType) -> Result<String> {
        Ok("<h1>Example Domain</h1>".into())
    }
    async fn click(&self, _selector: &str) -> Result<String> {
        Ok("clicked".into())
    }
    async fn enter_text(&self, _selector: &str, _text: &str) -> Result<String> {
        Ok("entered".into())
    }
    async fn press_key_combination(&self, _combo: &str) -> Result<String> {
        Ok("pressed".into())
    }
    async fn hover(&self, _selector: &str) -> Result<String> {
        Ok("hovered".into())
    }
}

async fn orchestrator_with(
    llm: Arc<ScriptedLlm>,
    config: OrchestratorConfig,
    deps: ToolDeps,
) -> Orchestrator {
    Orchestrator::builder(config)
        .llm(llm)
        .tool_deps(deps)
        .build()
        .await
        .unwrap()
}

/// S1: planner terminates on the first turn; no navigator runs.
#[tokio::test]
async fn immediate_termination() {
    let llm = ScriptedLlm::new(vec![planner_done("Nothing to do")]);
    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("Do nothing", None).await.unwrap();

    assert_eq!(result.final_response, "Nothing to do");
    assert_eq!(result.terminated_reason, TerminatedReason::Ok);
    assert!(result.assertions.is_empty());
    // Exactly one LLM round-trip: the planner's.
    assert_eq!(llm.calls(), 1);
}

/// S2: one browser step with one tool call and a passing assertion.
#[tokio::test]
async fn single_browser_step_with_assertion() {
    let llm = ScriptedLlm::new(vec![
        planner_step("Open https://example.com", "browser"),
        tool_call("openurl", serde_json::json!({"url": "https://example.com"})),
        nav_done("title=Example Domain"),
        Message::assistant(
            serde_json::json!({
                "terminate": "yes",
                "final_response": "Title matches.",
                "is_assert": true,
                "assert_summary": "EXPECTED RESULT: Example Domain\nACTUAL RESULT: Example Domain",
                "is_passed": true,
                "target_helper": "Not_Applicable",
            })
            .to_string(),
        ),
    ]);

    let deps = ToolDeps {
        browser: Some(FakeDriver::new() as Arc<dyn BrowserDriver>),
        ..Default::default()
    };
    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), deps).await;

    let result = orchestrator
        .process_command(
            "Open https://example.com and confirm the title is 'Example Domain'",
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.final_response, "Title matches.");
    assert_eq!(result.terminated_reason, TerminatedReason::Ok);
    assert_eq!(result.assertions.len(), 1);
    assert!(result.assertions[0].passed);
    assert!(result.assertions[0].summary.contains("EXPECTED"));
    assert!(result.assertions[0].summary.contains("ACTUAL"));
    assert_eq!(result.cost_summary.tool_calls, 1);
    // 2 planner turns + 2 proposer turns.
    assert_eq!(llm.calls(), 4);

    // The navigator's reflection message carries the target marker.
    let nav_request = llm.request(1);
    let reflection = &nav_request.last().unwrap().content;
    assert!(reflection.contains("##target_helper: browser##"));
}

/// S3: a stuck navigator is cut off and the planner continues.
#[tokio::test]
async fn loop_detection_recovers() {
    // Unregistered tool: every proposal comes back as a not-found
    // observation, and the identical retries trip the detector.
    let repeat = || tool_call("poll_status", serde_json::json!({"url": "https://api.test/x"}));
    let llm = ScriptedLlm::new(vec![
        planner_step("poll the endpoint", "api"),
        repeat(),
        repeat(),
        repeat(),
        planner_done("gave up politely"),
    ]);

    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("poll", None).await.unwrap();

    assert_eq!(result.terminated_reason, TerminatedReason::Ok);
    assert_eq!(result.final_response, "gave up politely");

    // The planner's second request saw the stuck diagnostic.
    let planner_request = llm.request(4);
    let observation = &planner_request.last().unwrap().content;
    assert!(observation.contains("no progress"));
}

/// S4: planner never terminates; the outer round budget caps the session.
#[tokio::test]
async fn planner_round_budget() {
    let mut script = Vec::new();
    for _ in 0..3 {
        script.push(planner_step("do it again", "api"));
        script.push(nav_done("did it"));
    }
    let llm = ScriptedLlm::new(script);

    let config = OrchestratorConfig {
        planner_max_rounds: 3,
        ..Default::default()
    };
    let orchestrator = orchestrator_with(Arc::clone(&llm), config, ToolDeps::default()).await;

    let result = orchestrator.process_command("loop forever", None).await.unwrap();

    assert_eq!(result.terminated_reason, TerminatedReason::RoundBudget);
    assert!(result.final_response.contains("round budget"));
    // 3 planner + 3 navigator round-trips, nothing more.
    assert_eq!(llm.calls(), 6);
}

/// S5: a failed assertion is an expected terminal state, not an error.
#[tokio::test]
async fn assertion_failure_terminates_ok() {
    let llm = ScriptedLlm::new(vec![Message::assistant(
        serde_json::json!({
            "terminate": "yes",
            "final_response": "Status mismatch",
            "is_assert": true,
            "assert_summary": "EXPECTED RESULT: 200\nACTUAL RESULT: 500",
            "is_passed": false,
            "target_helper": "Not_Applicable",
        })
        .to_string(),
    )]);

    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("check status", None).await.unwrap();

    assert_eq!(result.terminated_reason, TerminatedReason::Ok);
    assert_eq!(result.final_response, "Status mismatch");
    assert_eq!(result.assertions.len(), 1);
    assert!(!result.assertions[0].passed);
}

/// S6: successive steps fan out to different navigators, and no inner history
/// leaks across them.
#[tokio::test]
async fn cross_navigator_dispatch() {
    let llm = ScriptedLlm::new(vec![
        planner_step("count the users in the database", "sql"),
        nav_done("sql summary: 3 users"),
        planner_step("fetch the user list", "api"),
        nav_done("api summary: 200 ok"),
        planner_step("open the admin page", "browser"),
        nav_done("browser summary: page open"),
        planner_done("all steps done"),
    ]);

    let deps = ToolDeps {
        browser: Some(FakeDriver::new() as Arc<dyn BrowserDriver>),
        ..Default::default()
    };
    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), deps).await;

    let result = orchestrator.process_command("multi step", None).await.unwrap();

    assert_eq!(result.terminated_reason, TerminatedReason::Ok);
    assert_eq!(result.final_response, "all steps done");

    // Each navigator's first request holds only its own reflection message,
    // not the other navigators' traffic.
    let sql_request = llm.request(1);
    assert_eq!(sql_request.len(), 2); // system + reflection
    assert!(sql_request[1].content.contains("##target_helper: sql##"));

    let api_request = llm.request(3);
    assert_eq!(api_request.len(), 2);
    assert!(api_request[1].content.contains("##target_helper: api##"));
    assert!(!api_request[1].content.contains("sql"));

    let browser_request = llm.request(5);
    assert_eq!(browser_request.len(), 2);
    assert!(browser_request[1].content.contains("##target_helper: browser##"));

    // The planner accumulated one summary per navigator visit.
    let final_planner_request = llm.request(6);
    let observations: Vec<_> = final_planner_request
        .iter()
        .filter(|m| m.content.contains("summary:"))
        .collect();
    assert_eq!(observations.len(), 3);
}

/// Property 10: no target and no termination ends the session as no_target.
#[tokio::test]
async fn no_target_terminates() {
    let llm = ScriptedLlm::new(vec![Message::assistant(
        serde_json::json!({
            "next_step": "something",
            "terminate": "no",
            "target_helper": "Not_Applicable",
        })
        .to_string(),
    )]);

    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("go", None).await.unwrap();
    assert_eq!(result.terminated_reason, TerminatedReason::NoTarget);
    assert!(!result.final_response.is_empty());
}

/// Property 11: an empty navigator reply becomes the recoverable placeholder.
#[tokio::test]
async fn empty_navigator_summary_is_recoverable() {
    let llm = ScriptedLlm::new(vec![
        planner_step("do something", "api"),
        Message::assistant("##TERMINATE TASK##".to_string()),
        planner_done("wrapped up"),
    ]);

    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("go", None).await.unwrap();
    assert_eq!(result.terminated_reason, TerminatedReason::Ok);

    let planner_request = llm.request(2);
    assert_eq!(
        planner_request.last().unwrap().content,
        EMPTY_SUMMARY_PLACEHOLDER
    );

    // The placeholder also lands in the result's chat log.
    assert!(result
        .chat_log
        .iter()
        .any(|m| m.content == EMPTY_SUMMARY_PLACEHOLDER));
}

/// Unparseable planner output terminates defensively with the raw message.
#[tokio::test]
async fn defensive_parse_failure() {
    let llm = ScriptedLlm::new(vec![Message::assistant("total gibberish, sorry")]);

    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    let result = orchestrator.process_command("go", None).await.unwrap();
    assert_eq!(result.terminated_reason, TerminatedReason::ParseError);
    assert_eq!(result.final_response, "total gibberish, sorry");
}

/// Per-navigator budget exhaustion ends the session as nav_budget.
#[tokio::test]
async fn navigator_budget_terminates_session() {
    let llm = ScriptedLlm::new(vec![
        planner_step("never finishes", "api"),
        Message::assistant("thinking..."),
    ]);

    let config = OrchestratorConfig {
        navigator_max_rounds: 1,
        ..Default::default()
    };
    let orchestrator = orchestrator_with(Arc::clone(&llm), config, ToolDeps::default()).await;

    let result = orchestrator.process_command("go", None).await.unwrap();
    assert_eq!(result.terminated_reason, TerminatedReason::NavBudget);
    assert!(result.final_response.contains("exhausted"));
}

/// A cancelled session exits at the next turn boundary with reason cancelled.
#[tokio::test]
async fn cancellation_is_observed() {
    let llm = ScriptedLlm::new(vec![planner_done("should never be reached")]);
    let orchestrator =
        orchestrator_with(Arc::clone(&llm), OrchestratorConfig::default(), ToolDeps::default())
            .await;

    orchestrator.cancel_handle().cancel();
    let result = orchestrator.process_command("go", None).await.unwrap();

    assert_eq!(result.terminated_reason, TerminatedReason::Cancelled);
    assert_eq!(llm.calls(), 0);
}

/// Summaries flagged with the save-to-memory marker reach the recall store.
#[tokio::test]
async fn save_in_mem_flag_routes_to_recall_store() {
    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RecallStore for RecordingStore {
        async fn save_content(&self, text: &str) -> Result<()> {
            self.saved.lock().unwrap().push(text.to_string());
            Ok(())
        }
        async fn query(&self, _context: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    let llm = ScriptedLlm::new(vec![
        planner_step("remember the order id", "sql"),
        Message::assistant("order id is 42 ##FLAG::SAVE_IN_MEM## ##TERMINATE TASK##".to_string()),
        planner_done("stored"),
    ]);

    let store = Arc::new(RecordingStore::default());
    let config = OrchestratorConfig {
        memory_mode: testpilot::memory::MemoryMode::Dynamic,
        ..Default::default()
    };
    let orchestrator = Orchestrator::builder(config)
        .llm(llm)
        .recall_store(Arc::clone(&store) as Arc<dyn RecallStore>)
        .build()
        .await
        .unwrap();

    let result = orchestrator.process_command("go", None).await.unwrap();
    assert_eq!(result.terminated_reason, TerminatedReason::Ok);

    let saved = store.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0], "order id is 42");
}
