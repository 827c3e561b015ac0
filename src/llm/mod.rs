//! LLM transport seam
//!
//! The orchestrator never talks to a provider directly; planners and
//! navigators hold an `Arc<dyn LlmClient>`. The production implementation is
//! [`OpenRouterClient`]; tests substitute a scripted client.

mod openrouter;
pub mod types;

pub use openrouter::{OpenRouterClient, OpenRouterConfig};
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Abstraction over one LLM round-trip.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and safe
/// for concurrent use across sessions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain chat completion (no tools advertised).
    async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse>;

    /// Chat completion with tool definitions advertised to the model.
    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse>;
}
