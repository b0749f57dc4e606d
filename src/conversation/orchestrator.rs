//! Turn-by-turn protocol between the model and the tool server.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{ChatEvent, ChatEventSink, ConnectionState, EventEmitter, QueryId};
use super::hops::HopPolicy;
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::mcp::connector::{Connector, MCPConnector, ToolServer};
use crate::mcp::schema::load_tools;
use crate::mcp::target::ServerTarget;
use crate::provider::{self, MessageRequest, MessageResponse, ModelProvider, ToolUnion};
use crate::types::{ContentBlock, Message, ToolResult, ToolUse};

/// Model settings used for every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub model: String,
    pub max_tokens: u32,
    pub hop_policy: HopPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            model: config.model().to_string(),
            max_tokens: config.max_tokens(),
            hop_policy: config.hop_policy(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// A live tool-server channel and the catalog loaded over it.
struct Connection {
    target: ServerTarget,
    server: Box<dyn ToolServer>,
    catalog: Vec<ToolUnion>,
}

/// Drives queries through the model, calling tools on its behalf.
///
/// Holds at most one connection. Reconnecting releases the previous channel
/// and its catalog before the new one is opened.
pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    connector: Arc<dyn Connector>,
    settings: OrchestratorSettings,
    connection: Option<Connection>,
    connecting: bool,
    events: EventEmitter,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        connector: Arc<dyn Connector>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            connector,
            settings,
            connection: None,
            connecting: false,
            events: EventEmitter::new(None),
        }
    }

    /// Build an orchestrator with the configured provider and real MCP transports.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let provider = provider::create_provider(config)?;
        let connector =
            Arc::new(MCPConnector::new().with_reconnect_interval(config.reconnect_interval()));
        Ok(Self::new(
            provider,
            connector,
            OrchestratorSettings::from_config(config),
        ))
    }

    pub fn with_event_sink(mut self, sink: ChatEventSink) -> Self {
        self.events = EventEmitter::new(Some(sink));
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.connection, self.connecting) {
            (_, true) => ConnectionState::Connecting,
            (Some(connection), false) => ConnectionState::Connected {
                tool_count: connection.catalog.len(),
            },
            (None, false) => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Target of the live connection.
    pub fn target(&self) -> Option<&ServerTarget> {
        self.connection.as_ref().map(|c| &c.target)
    }

    /// Tools loaded on the live connection, in server order.
    pub fn catalog(&self) -> &[ToolUnion] {
        self.connection
            .as_ref()
            .map(|c| c.catalog.as_slice())
            .unwrap_or_default()
    }

    /// Connect to a tool server and load its catalog.
    ///
    /// Any existing connection is closed first. If the catalog cannot be
    /// loaded the new channel is closed again and the orchestrator stays
    /// disconnected.
    pub async fn connect(&mut self, target: &ServerTarget) -> Result<(), ChatError> {
        self.close().await;

        self.events.emit(ChatEvent::Connecting {
            target: target.to_string(),
        });
        let result = {
            let _connecting = ConnectingFlag::raise(&mut self.connecting);
            open(self.connector.as_ref(), target).await
        };

        match result {
            Ok(connection) => {
                let tools: Vec<String> = connection
                    .catalog
                    .iter()
                    .map(|tool| tool.name.clone())
                    .collect();
                info!(target = %target, tools = tools.len(), "tool server ready");
                self.connection = Some(connection);
                self.events.emit(ChatEvent::Connected {
                    target: target.to_string(),
                    tools,
                });
                Ok(())
            }
            Err(error) => {
                warn!(target = %target, error = %error, "failed to connect to tool server");
                self.events.emit(ChatEvent::Error {
                    query_id: None,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Release the live connection, if any. Close failures are logged.
    pub async fn close(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        if let Err(error) = connection.server.close().await {
            warn!(target = %connection.target, error = %error, "error while closing tool server");
        }
        info!(target = %connection.target, "disconnected from tool server");
        self.events.emit(ChatEvent::Disconnected);
    }

    /// Answer a user query, calling tools as the model requests them.
    ///
    /// Either returns the complete answer or fails; no partial output is
    /// returned on error. Blank queries are rejected before any model call.
    pub async fn process_query(&mut self, query: &str) -> Result<String, ChatError> {
        if query.trim().is_empty() {
            return Err(ChatError::InvalidArgument("query is empty".into()));
        }
        let connection = self.connection.as_mut().ok_or(ChatError::NotConnected)?;
        let query_id = Uuid::new_v4();
        self.events.emit(ChatEvent::QueryStarted {
            query_id,
            query: query.to_string(),
        });
        debug!(%query_id, policy = ?self.settings.hop_policy, "processing query");

        let mut turn = Turn {
            query_id,
            provider: self.provider.as_ref(),
            settings: &self.settings,
            connection,
            events: &self.events,
            history: vec![Message::user(query)],
        };
        let result = match self.settings.hop_policy {
            HopPolicy::SingleFollowUp => turn.run_single().await,
            HopPolicy::MultiHop { max_hops } => turn.run_multi(max_hops).await,
        };

        match &result {
            Ok(answer) => self.events.emit(ChatEvent::AnswerReady {
                query_id,
                answer: answer.clone(),
            }),
            Err(error) => {
                warn!(%query_id, error = %error, "query failed");
                self.events.emit(ChatEvent::Error {
                    query_id: Some(query_id),
                    message: error.to_string(),
                });
            }
        }
        result
    }
}

/// Marks a connect attempt in flight; lowered on drop, so a cancelled
/// `connect` future leaves the orchestrator disconnected.
struct ConnectingFlag<'a>(&'a mut bool);

impl<'a> ConnectingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for ConnectingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

async fn open(connector: &dyn Connector, target: &ServerTarget) -> Result<Connection, ChatError> {
    let mut server = connector.connect(target).await?;
    match load_tools(server.as_mut()).await {
        Ok(catalog) => Ok(Connection {
            target: target.clone(),
            server,
            catalog,
        }),
        Err(error) => {
            if let Err(close_error) = server.close().await {
                warn!(error = %close_error, "failed to close channel after catalog error");
            }
            Err(error)
        }
    }
}

/// State of one `process_query` call, including its private history.
struct Turn<'a> {
    query_id: QueryId,
    provider: &'a dyn ModelProvider,
    settings: &'a OrchestratorSettings,
    connection: &'a mut Connection,
    events: &'a EventEmitter,
    history: Vec<Message>,
}

impl Turn<'_> {
    /// Ask once; tool results feed exactly one follow-up completion each.
    async fn run_single(&mut self) -> Result<String, ChatError> {
        let response = self.ask(true).await?;
        let mut output = Vec::new();

        for block in &response.content {
            match block {
                ContentBlock::Text { text } => output.push(text.clone()),
                ContentBlock::ToolUse(call) => {
                    output.push(trace_line(call));
                    let result = self.invoke(call).await?;
                    self.history
                        .push(Message::tool_results(vec![ToolResult::unlinked(
                            call.name.clone(),
                            result,
                        )]));
                    let follow_up = self.ask(false).await?;
                    output.push(follow_up.first_text().unwrap_or_default().to_string());
                }
                ContentBlock::ToolResult(_) => {}
            }
        }

        Ok(output.join("\n"))
    }

    /// Loop until the model answers without requesting tools.
    async fn run_multi(&mut self, max_hops: usize) -> Result<String, ChatError> {
        let mut output = Vec::new();
        let mut hops = 0;

        loop {
            let response = self.ask(true).await?;
            if !response.has_tool_use() {
                output.extend(
                    response
                        .content
                        .iter()
                        .filter_map(ContentBlock::as_text)
                        .map(str::to_string),
                );
                return Ok(output.join("\n"));
            }
            if hops == max_hops {
                return Err(ChatError::HopLimitExceeded { max_hops });
            }
            hops += 1;

            let mut results = Vec::new();
            for block in &response.content {
                match block {
                    ContentBlock::Text { text } => output.push(text.clone()),
                    ContentBlock::ToolUse(call) => {
                        output.push(trace_line(call));
                        let result = self.invoke(call).await?;
                        results.push(ToolResult::linked(call, result));
                    }
                    ContentBlock::ToolResult(_) => {}
                }
            }
            self.history.push(Message::assistant(response.content));
            self.history.push(Message::tool_results(results));
        }
    }

    async fn ask(&mut self, with_tools: bool) -> Result<MessageResponse, ChatError> {
        let request = MessageRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            messages: self.history.clone(),
            tools: with_tools.then(|| self.connection.catalog.clone()),
        };
        debug!(
            query_id = %self.query_id,
            provider = self.provider.provider_name(),
            messages = request.messages.len(),
            with_tools,
            "calling model"
        );
        self.provider
            .create_message(&request)
            .await
            .map_err(ChatError::model_call)
    }

    async fn invoke(&mut self, call: &ToolUse) -> Result<String, ChatError> {
        if !self
            .connection
            .catalog
            .iter()
            .any(|tool| tool.name == call.name)
        {
            return Err(ChatError::tool(
                call.name.clone(),
                "model requested a tool the server does not offer",
            ));
        }

        self.events.emit(ChatEvent::ToolCallStarted {
            query_id: self.query_id,
            tool_name: call.name.clone(),
            arguments: call.input.clone(),
        });
        info!(query_id = %self.query_id, tool = call.name.as_str(), "calling tool");

        let result = self
            .connection
            .server
            .call_tool(&call.name, call.input.clone())
            .await
            .map_err(|error| match error {
                ChatError::ToolInvocation { .. } => error,
                other => ChatError::tool(call.name.clone(), other.to_string()),
            })?;

        self.events.emit(ChatEvent::ToolCallCompleted {
            query_id: self.query_id,
            tool_name: call.name.clone(),
            result: result.text.clone(),
        });
        Ok(result.text)
    }
}

/// Human-readable marker for a tool call in the answer text.
pub fn trace_line(call: &ToolUse) -> String {
    format!("[Calling tool {} with args {}]", call.name, call.input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trace_line_uses_compact_json() {
        let call = ToolUse {
            id: "toolu_1".into(),
            name: "search".into(),
            input: json!({ "q": "weather" }),
        };
        assert_eq!(
            trace_line(&call),
            r#"[Calling tool search with args {"q":"weather"}]"#
        );
    }

    #[test]
    fn connecting_flag_is_lowered_on_drop() {
        let mut connecting = false;
        {
            let flag = ConnectingFlag::raise(&mut connecting);
            assert!(*flag.0);
        }
        assert!(!connecting);
    }

    #[test]
    fn settings_follow_config() {
        let config = ChatConfig::new()
            .with_model("claude-test")
            .with_max_tokens(64)
            .with_max_hops(2);
        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.model, "claude-test");
        assert_eq!(settings.max_tokens, 64);
        assert_eq!(settings.hop_policy, HopPolicy::MultiHop { max_hops: 2 });
    }
}
