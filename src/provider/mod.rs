//! Model provider trait and implementations.

pub mod http;

#[cfg(feature = "anthropic")]
pub mod anthropic;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::types::{ContentBlock, Message, ToolUse};

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolUnion>>,
}

/// Tool definition in the shape the messaging API expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUnion {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// Input schema of a [`ToolUnion`].
///
/// `required` is a named field rather than a loose extra property, and is
/// always serialized, even when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
    Other(String),
}

impl StopReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "end_turn" => Self::EndTurn,
            "max_tokens" => Self::MaxTokens,
            "tool_use" => Self::ToolUse,
            "stop_sequence" => Self::StopSequence,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Token accounting for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Response from a provider. Content blocks keep the order the model
/// produced them in.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub usage: Usage,
}

impl MessageResponse {
    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        })
    }

    pub fn has_tool_use(&self) -> bool {
        self.tool_uses().next().is_some()
    }
}

/// Core trait implemented by model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "anthropic").
    fn provider_name(&self) -> &str;

    /// Request one completion.
    async fn create_message(&self, request: &MessageRequest)
        -> Result<MessageResponse, ChatError>;
}

/// Create the provider described by `config`.
#[cfg(feature = "anthropic")]
pub fn create_provider(config: &ChatConfig) -> Result<Arc<dyn ModelProvider>, ChatError> {
    let api_key = config
        .api_key()
        .ok_or_else(|| ChatError::Authentication("Missing ANTHROPIC_API_KEY".into()))?;
    Ok(Arc::new(anthropic::AnthropicProvider::new(
        api_key.to_string(),
        config.base_url().map(str::to_string),
    )))
}

/// Create the provider described by `config`.
#[cfg(not(feature = "anthropic"))]
pub fn create_provider(_config: &ChatConfig) -> Result<Arc<dyn ModelProvider>, ChatError> {
    Err(ChatError::Configuration(
        "No model provider enabled via feature flags".into(),
    ))
}
