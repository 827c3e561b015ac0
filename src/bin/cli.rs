//! TestPilot CLI
//!
//! Thin wrapper that builds an orchestrator from a JSON config file and runs
//! a single command against it. Interactive feature-file execution lives in
//! the surrounding tooling; this binary is the smallest useful entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use testpilot::config::OrchestratorConfig;
use testpilot::llm::{OpenRouterClient, OpenRouterConfig};
use testpilot::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "testpilot", version, about = "Autonomous test-execution agent engine")]
struct Cli {
    /// The test instruction to execute (Gherkin or free text)
    command: String,

    /// Starting page URL, if the task begins mid-navigation
    #[arg(long)]
    current_url: Option<String>,

    /// Path to an orchestrator config JSON file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Model to use (overrides TESTPILOT_MODEL)
    #[arg(long, env = "TESTPILOT_MODEL", default_value = "anthropic/claude-3.5-sonnet")]
    model: String,

    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Print the full chat log as JSON on exit
    #[arg(long)]
    dump_chat_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config: OrchestratorConfig = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw).context("parsing config file")?
        }
        None => OrchestratorConfig::default(),
    };

    let llm = Arc::new(OpenRouterClient::new(OpenRouterConfig {
        api_key: SecretString::from(cli.api_key),
        default_model: cli.model,
        base_url: "https://openrouter.ai/api/v1".to_string(),
        timeout_secs: 120,
    })?);

    let orchestrator = Orchestrator::builder(config).llm(llm).build().await?;

    let result = orchestrator
        .process_command(&cli.command, cli.current_url.as_deref())
        .await?;

    println!("result: {}", result.final_response);
    println!("reason: {:?}", result.terminated_reason);
    for assertion in &result.assertions {
        println!(
            "assertion [{}]: {}",
            if assertion.passed { "PASS" } else { "FAIL" },
            assertion.summary
        );
    }
    println!(
        "cost: {} tokens in, {} tokens out, {} tool calls",
        result.cost_summary.tokens_in, result.cost_summary.tokens_out, result.cost_summary.tool_calls
    );

    if cli.dump_chat_log {
        println!("{}", serde_json::to_string_pretty(&result.chat_log)?);
    }

    let failed = result.assertions.iter().any(|a| !a.passed);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
