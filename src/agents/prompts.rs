//! Prompt library and prompt building
//!
//! System prompts are fixed templates with enumerated substitution slots;
//! building one is a pure function of (template, substitutions). The literal
//! markers below are wire-level conventions shared with existing planner
//! prompts and must be preserved bit-exact.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde_json::json;

use crate::error::{Error, Result};

/// Sentinel a navigator emits to end its subtask
pub const TERMINATE_TASK: &str = "##TERMINATE TASK##";

/// Marker routing navigator summaries into long-term memory
pub const SAVE_IN_MEM: &str = "##FLAG::SAVE_IN_MEM##";

/// Substitution slot for preloaded test data
pub const BASIC_TEST_INFORMATION_SLOT: &str = "$basic_test_information";

/// Render the target-helper marker appended to reflection messages
pub fn target_helper_marker(tag: &str) -> String {
    format!("##target_helper: {}##", tag)
}

/// Extract the target-helper tag from a message, if the marker is present
pub fn parse_target_helper(message: &str) -> Option<&str> {
    let rest = message.split("##target_helper: ").nth(1)?;
    Some(rest.split("##").next()?.trim())
}

/// Forced-advancement instruction when a planner turn has no next step
pub const SKIP_STEP: &str = "skip this step";

/// System prompt for the planner agent
pub const PLANNER_AGENT_PROMPT: &str = r#"# Test EXECUTION Task Planner, YOU ARE TESTING THE APPLICATION

You are a test EXECUTION task planner that processes Gherkin BDD feature tasks and executes them through a helper.

## Core Responsibilities
- Parse Gherkin BDD features and create VERY DETAILED EXPANDED step-by-step execution plans
- Include assertion validation in subtasks
- Delegate atomic operations to helper
- Analyze helper responses before proceeding
- Expand the plan to fullest considering test data, unroll the loops as per test data
- Stick to the test case and test data provided while building the plan
- target_helper should be as per the next step operation
- ALL INFORMATION TO BE PASSED TO THE HELPER SHOULD BE IN THE NEXT_STEP IF IN MIDDLE OF PLAN EXECUTION

## Response Format
Must return well-formatted JSON with:
{
"plan": "VERY DETAILED EXPANDED plan (step-by-step with step numbers), ALL IN STRING FORMAT",
"next_step": "Atomic operation for helper, AS PER ONLY PLAN and ALWAYS COURSE CORRECT, ALL IN STRING FORMAT",
"terminate": "'yes' when complete/failed, 'no' during iterations",
"final_response": "Task outcome (only when terminate='yes')",
"is_assert": "boolean - if current step is assertion",
"assert_summary": "EXPECTED RESULT: x\nACTUAL RESULT: y (required if is_assert=true)",
"is_passed": "boolean - assertion success status",
"target_helper": "'browser'|'api'|'sec'|'sql'|'time_keeper'|'mcp'|'Not_Applicable'"
}

## Helper Capabilities
- Browser: Page navigation, element interaction, state verification
- API: Endpoint interactions, response handling
- Security: Security testing constructs
- SQL: Intent-based database operations
- Time Keeper: Pauses execution for specified duration in seconds
- All helpers are stateless and handle one operation at a time

## Critical Rules
1. One atomic operation per step
2. Always verify before terminating
3. Terminate on assertion failures
4. Handle all iterations completely
5. Provide detailed failure summaries
6. Return single JSON response, no duplicate JSON keys
7. Termination scenario should always be an assert
8. Never provide explanation or notes, only JSON response

Available Test Data: $basic_test_information"#;

/// System prompt for the browser navigator's proposer
pub const BROWSER_AGENT_PROMPT: &str = r#"# Web Navigation Agent
You are a web navigation agent that executes single browser operations through the provided tools.

## Core Rules
1. Process browser tasks only
2. Execute one tool at a time and wait for its result before the next
3. Use only DOM-derived selectors; fetch the DOM before interacting
4. Never assume page state; verify after every action
5. Pass exact test values, never modify test data

## Response Format
Success:
[Action summary with verified outcome]
##TERMINATE TASK##

Error:
[Issue description and what is needed]
##TERMINATE TASK##

Available Test Data: $basic_test_information"#;

/// System prompt for the API navigator's proposer
pub const API_AGENT_PROMPT: &str = r#"# API Navigation Agent
You are an API navigation agent that executes API calls and handles responses.

## Core Rules
1. Process API tasks only
2. Execute one function at a time, wait for response before next call
3. Build payloads from actual results and API specs only
4. Always document status codes and execution time in the response summary
5. Never modify test data

## Response Format
Success:
[Action summary]
##TERMINATE TASK##

Error:
[Issue description]
[Required information]
##TERMINATE TASK##

Available Test Data: $basic_test_information"#;

/// System prompt for the SQL navigator's proposer
pub const SQL_AGENT_PROMPT: &str = r#"# Database Operations Agent
You will ONLY perform database operations and query validations. DENY ALL NON-DATABASE TASKS.

## Core Rules
1. Use provided schema and data, no external data creation
2. Sequential operations with step confirmation
3. Detailed error reporting, limited retry attempts
4. Construct queries yourself from the operation intent you are given

## Response Format
Task completion:
[Verification summary with query results]
##FLAG::SAVE_IN_MEM##
##TERMINATE TASK##
Failures:
[Detailed explanation]
##TERMINATE TASK##

Available Test Data: $basic_test_information"#;

/// System prompt for the security navigator's proposer
pub const SEC_AGENT_PROMPT: &str = r#"# Security Testing Agent
You will ONLY perform security testing. DENY ALL NON-SECURITY TESTING REQUESTS.

## Core Rules
1. One security test at a time; document results thoroughly
2. Use API specs for test payloads; analyze responses
3. No test retries; generate a findings report (endpoint, risk, payloads, responses)
4. Terminate unclear tests and explain why

## Response Format
[Findings summary]
##TERMINATE TASK##

Test Data: $basic_test_information"#;

/// System prompt for the time keeper navigator's proposer
pub const TIME_KEEPER_AGENT_PROMPT: &str = r#"# Static Wait Operations Agent
You will ONLY perform static wait operations. DENY ALL NON-WAIT TASKS.

## Core Rules
1. Accept only numeric wait durations in seconds, maximum 3600
2. One wait operation at a time, confirm completion
3. Report the exact wait time

## Response Format
"Waited for X seconds" ##TERMINATE TASK##
Invalid requests: explanation ##TERMINATE TASK##

Available Test Data: $basic_test_information"#;

/// System prompt for the MCP navigator's proposer
pub const MCP_AGENT_PROMPT: &str = r#"# MCP Operations Agent
You execute operations against connected MCP servers through the provided tools.

## Core Rules
1. One tool call at a time; wait for its result before the next
2. Use only the advertised tools and their documented parameters
3. Summarize the server's answer, do not invent data

## Response Format
[Result summary]
##TERMINATE TASK##

Available Test Data: $basic_test_information"#;

/// System prompt for the user proxy seat
pub const USER_AGENT_PROMPT: &str = "A proxy for the user for executing the user commands.";

/// Template for the initial command prompt
const COMMAND_EXECUTION_TEMPLATE: &str =
    r#"Execute the user task "{{command}}" {{current_url_segment}}"#;

/// Build the initial user prompt for a command
pub fn build_command_prompt(command: &str, current_url: Option<&str>) -> Result<String> {
    let current_url_segment = current_url
        .map(|url| format!("Current Page: {}", url))
        .unwrap_or_default();

    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string("command_execution", COMMAND_EXECUTION_TEMPLATE)
        .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

    registry
        .render(
            "command_execution",
            &json!({
                "command": command,
                "current_url_segment": current_url_segment,
            }),
        )
        .map(|s| s.trim_end().to_string())
        .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
}

/// Build a system prompt from its base template.
///
/// Pure function of the inputs: the test-information slot is substituted when
/// data exists, and the timestamp is appended.
pub fn build_system_prompt(
    base: &str,
    test_information: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let body = match test_information {
        Some(info) if !info.trim().is_empty() => {
            base.replace(BASIC_TEST_INFORMATION_SLOT, &format!("\n{}", info))
        }
        _ => base.replace(BASIC_TEST_INFORMATION_SLOT, "none provided"),
    };
    format!(
        "{}\nCurrent timestamp is {}",
        body,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Default proposer prompt for a navigator tag
pub fn default_prompt_for(tag: crate::agents::NavigatorTag) -> &'static str {
    use crate::agents::NavigatorTag::*;
    match tag {
        Browser => BROWSER_AGENT_PROMPT,
        Api => API_AGENT_PROMPT,
        Sql => SQL_AGENT_PROMPT,
        Sec => SEC_AGENT_PROMPT,
        TimeKeeper => TIME_KEEPER_AGENT_PROMPT,
        Mcp => MCP_AGENT_PROMPT,
        // No built-in bundle ships for these; callers registering their own
        // tools usually bring their own prompt too.
        Composio | Executor => API_AGENT_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_prompt_with_url() {
        let prompt =
            build_command_prompt("Open the login page", Some("https://example.com")).unwrap();
        assert_eq!(
            prompt,
            r#"Execute the user task "Open the login page" Current Page: https://example.com"#
        );
    }

    #[test]
    fn command_prompt_without_url() {
        let prompt = build_command_prompt("Do nothing", None).unwrap();
        assert_eq!(prompt, r#"Execute the user task "Do nothing""#);
    }

    #[test]
    fn system_prompt_substitutes_test_information() {
        let now = Utc::now();
        let prompt = build_system_prompt("Data: $basic_test_information", Some("user=admin"), now);
        assert!(prompt.contains("user=admin"));
        assert!(!prompt.contains(BASIC_TEST_INFORMATION_SLOT));
        assert!(prompt.contains("Current timestamp is"));
    }

    #[test]
    fn system_prompt_without_test_information() {
        let now = Utc::now();
        let prompt = build_system_prompt("Data: $basic_test_information", None, now);
        assert!(prompt.contains("none provided"));
    }

    #[test]
    fn target_helper_marker_round_trip() {
        let marker = target_helper_marker("browser");
        assert_eq!(marker, "##target_helper: browser##");
        let message = format!("Open the page {}", marker);
        assert_eq!(parse_target_helper(&message), Some("browser"));
    }

    #[test]
    fn target_helper_absent() {
        assert_eq!(parse_target_helper("no marker here"), None);
    }

    #[test]
    fn markers_are_bit_exact() {
        assert_eq!(TERMINATE_TASK, "##TERMINATE TASK##");
        assert_eq!(SAVE_IN_MEM, "##FLAG::SAVE_IN_MEM##");
    }
}
