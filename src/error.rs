//! Error types for TestPilot

use thiserror::Error;

/// Result type alias using TestPilot's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for TestPilot
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider API error
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// Planner output could not be parsed into an envelope
    #[error("Parse error: {0}")]
    Parse(String),

    /// A tool was registered twice for the same navigator tag
    #[error("Duplicate tool '{name}' for navigator '{tag}'")]
    DuplicateTool { tag: String, name: String },

    /// A navigator requested a tool outside its visibility set
    #[error("Tool '{name}' not found for navigator '{tag}'")]
    ToolNotFound { tag: String, name: String },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// External resource permanently unavailable (browser crashed, DB gone)
    #[error("Fatal external error: {0}")]
    FatalExternal(String),

    /// Session cancelled from outside
    #[error("Cancelled")]
    Cancelled,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit(_) | Error::Timeout(_)
        )
    }

    /// Fatal errors end the session; everything else is recoverable at the
    /// executor layer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalExternal(_) | Error::Cancelled)
    }

    /// Short machine-readable kind, used when a tool error is fed back to a
    /// navigator as an observation message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Provider(_) => "provider",
            Error::Parse(_) => "parse",
            Error::DuplicateTool { .. } => "duplicate_tool",
            Error::ToolNotFound { .. } => "tool_not_found",
            Error::Http(_) => "http",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
            Error::InvalidInput(_) => "invalid_input",
            Error::RateLimit(_) => "rate_limit",
            Error::Unauthorized(_) => "unauthorized",
            Error::Timeout(_) => "timeout",
            Error::FatalExternal(_) => "fatal_external",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal",
        }
    }
}
