//! Shared test helpers: a scripted model provider and in-memory tool servers.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use mcp_chat::error::ChatError;
use mcp_chat::mcp::{Connector, MCPToolCallResult, ServerTarget, ToolDescriptor, ToolServer};
use mcp_chat::provider::{MessageRequest, MessageResponse, ModelProvider, StopReason, Usage};
use mcp_chat::types::{ContentBlock, ToolUse};

pub fn text(text: &str) -> ContentBlock {
    ContentBlock::text(text)
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolUse(ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    })
}

/// `search` tool with a required `q` argument.
pub fn search_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "search",
        Some("web search".into()),
        json!({
            "type": "object",
            "properties": { "q": { "type": "string" } },
            "required": ["q"]
        }),
    )
}

pub fn named_tool(name: &str) -> ToolDescriptor {
    ToolDescriptor::new(
        name,
        Some(format!("{name} tool")),
        json!({ "type": "object", "properties": {} }),
    )
}

/// A provider that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<MessageResponse, ChatError>>>,
    requests: Mutex<Vec<MessageRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response made of `blocks`.
    pub fn queue(&self, blocks: Vec<ContentBlock>) {
        let stop_reason = if blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse(_)))
        {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };
        self.responses.lock().unwrap().push_back(Ok(MessageResponse {
            content: blocks,
            stop_reason: Some(stop_reason),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }));
    }

    pub fn queue_text(&self, value: &str) {
        self.queue(vec![text(value)]);
    }

    pub fn queue_error(&self, error: ChatError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn create_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::api(500, "no scripted response left")))
    }
}

/// What a [`MockToolServer`] saw.
#[derive(Debug, Default)]
pub struct ServerLog {
    pub calls: Vec<(String, serde_json::Value)>,
    pub list_calls: usize,
    pub closes: usize,
}

/// In-memory tool server with canned results.
pub struct MockToolServer {
    tools: Vec<ToolDescriptor>,
    results: HashMap<String, Result<String, String>>,
    list_error: Option<String>,
    log: Arc<Mutex<ServerLog>>,
}

impl MockToolServer {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            results: HashMap::new(),
            list_error: None,
            log: Arc::new(Mutex::new(ServerLog::default())),
        }
    }

    pub fn with_result(mut self, tool: &str, text: &str) -> Self {
        self.results.insert(tool.to_string(), Ok(text.to_string()));
        self
    }

    pub fn with_failure(mut self, tool: &str, message: &str) -> Self {
        self.results
            .insert(tool.to_string(), Err(message.to_string()));
        self
    }

    pub fn failing_list(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn log(&self) -> Arc<Mutex<ServerLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl ToolServer for MockToolServer {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        self.log.lock().unwrap().list_calls += 1;
        match &self.list_error {
            Some(message) => Err(ChatError::Transport(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, ChatError> {
        self.log
            .lock()
            .unwrap()
            .calls
            .push((name.to_string(), arguments));
        match self.results.get(name) {
            Some(Ok(text)) => Ok(MCPToolCallResult {
                text: text.clone(),
                content: vec![json!({ "type": "text", "text": text })],
            }),
            Some(Err(message)) => Err(ChatError::tool(name, message.clone())),
            None => Ok(MCPToolCallResult {
                text: String::new(),
                content: Vec::new(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Hands out queued servers, one per `connect`.
#[derive(Default)]
pub struct MockConnector {
    servers: Mutex<VecDeque<Result<MockToolServer, ChatError>>>,
    targets: Mutex<Vec<ServerTarget>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue(&self, server: MockToolServer) {
        self.servers.lock().unwrap().push_back(Ok(server));
    }

    pub fn queue_error(&self, error: ChatError) {
        self.servers.lock().unwrap().push_back(Err(error));
    }

    pub fn targets(&self) -> Vec<ServerTarget> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &ServerTarget) -> Result<Box<dyn ToolServer>, ChatError> {
        self.targets.lock().unwrap().push(target.clone());
        let next = self
            .servers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Transport("no server queued".into())));
        next.map(|server| Box::new(server) as Box<dyn ToolServer>)
    }
}
