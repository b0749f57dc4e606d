//! Anthropic Messages API provider.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::ChatError;
use crate::types::{ContentBlock, Message, Role, ToolResult, ToolUse};

use super::http::{anthropic_headers, shared_client, status_to_error};
use super::{MessageRequest, MessageResponse, ModelProvider, StopReason, Usage};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn build_request_body(&self, request: &MessageRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter_map(encode_message)
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        if let Some(ref tools) = request.tools {
            if !tools.is_empty() {
                body["tools"] = serde_json::json!(tools);
            }
        }

        body
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn create_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ChatError> {
        let body = self.build_request_body(request);
        let url = format!("{}/messages", self.base_url);

        debug!(
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Anthropic create_message"
        );

        let resp = shared_client()
            .post(&url)
            .headers(anthropic_headers(&self.api_key, API_VERSION))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: AnthropicResponse = resp.json().await?;
        Ok(decode_response(data))
    }
}

fn encode_message(message: &Message) -> Option<serde_json::Value> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    if let [ContentBlock::Text { text }] = message.content.as_slice() {
        return Some(serde_json::json!({ "role": role, "content": text }));
    }

    let content: Vec<serde_json::Value> = message
        .content
        .iter()
        .filter_map(|block| encode_block(message.role, block))
        .collect();

    if content.is_empty() {
        return None;
    }
    Some(serde_json::json!({ "role": role, "content": content }))
}

fn encode_block(role: Role, block: &ContentBlock) -> Option<serde_json::Value> {
    match (role, block) {
        (_, ContentBlock::Text { text }) if text.is_empty() => None,
        (_, ContentBlock::Text { text }) => Some(serde_json::json!({
            "type": "text",
            "text": text,
        })),
        (Role::Assistant, ContentBlock::ToolUse(call)) => Some(serde_json::json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.name,
            "input": call.input,
        })),
        (Role::User, ContentBlock::ToolResult(result)) => Some(encode_tool_result(result)),
        _ => None,
    }
}

/// Results tied to a `tool_use` id become native `tool_result` blocks. A
/// result without an id has no `tool_use` to answer, so it travels as plain
/// text naming the tool.
fn encode_tool_result(result: &ToolResult) -> serde_json::Value {
    match result.tool_use_id {
        Some(ref id) => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": id,
            "content": result.content,
            "is_error": result.is_error,
        }),
        None => serde_json::json!({
            "type": "text",
            "text": format!(
                "\"type\": \"tool_result\",\n\"tool_name\": {},\n\"result\": {}",
                result.tool_name, result.content
            ),
        }),
    }
}

fn decode_response(data: AnthropicResponse) -> MessageResponse {
    let content = data
        .content
        .into_iter()
        .filter_map(|block| match block.r#type.as_str() {
            "text" => Some(ContentBlock::Text {
                text: block.text.unwrap_or_default(),
            }),
            "tool_use" => match (block.id, block.name) {
                (Some(id), Some(name)) => Some(ContentBlock::ToolUse(ToolUse {
                    id,
                    name,
                    input: block
                        .input
                        .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
                })),
                _ => None,
            },
            _ => None,
        })
        .collect();

    MessageResponse {
        content,
        stop_reason: data.stop_reason.as_deref().map(StopReason::parse),
        usage: data
            .usage
            .map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default(),
    }
}

// Internal Anthropic response types

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
