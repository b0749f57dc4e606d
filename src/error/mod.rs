//! Error types for mcp-chat.

use thiserror::Error;

/// Primary error type for all mcp-chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unsupported server script '{path}': expected a .js, .py or .jar file")]
    UnsupportedScriptKind { path: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model call failed: {0}")]
    ModelCall(#[source] Box<ChatError>),

    #[error("Tool invocation error ({tool_name}): {message}")]
    ToolInvocation { tool_name: String, message: String },

    #[error("Tool loop exceeded {max_hops} hops")]
    HopLimitExceeded { max_hops: usize },

    #[error("Not connected to an MCP server")]
    NotConnected,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Broad error category, used by callers to pick a user-facing reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connecting to or talking with the tool server failed.
    Connection,
    /// The LLM call failed.
    Model,
    /// A tool call failed or the tool loop misbehaved.
    Tool,
    Configuration,
    Internal,
}

impl ChatError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool invocation error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Wrap a provider-level failure as a model call error.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn model_call(error: ChatError) -> Self {
        match error {
            Self::ModelCall(_) => error,
            other => Self::ModelCall(Box::new(other)),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedScriptKind { .. } | Self::Configuration(_) => {
                ErrorCategory::Configuration
            }
            Self::Transport(_) | Self::NotConnected => ErrorCategory::Connection,
            Self::ModelCall(_)
            | Self::Authentication(_)
            | Self::RateLimited { .. }
            | Self::Api { .. }
            | Self::Network(_) => ErrorCategory::Model,
            Self::ToolInvocation { .. } | Self::HopLimitExceeded { .. } => ErrorCategory::Tool,
            Self::Io(_) | Self::Serialization(_) | Self::InvalidArgument(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether repeating the same action by hand may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::ModelCall(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ChatError>;
