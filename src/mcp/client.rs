//! MCP client for connecting to MCP servers.

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, Content, JsonObject, ProtocolVersion,
        ResourceContents,
    },
    service::{ClientInitializeError, ServiceError},
};
use tracing::{debug, warn};

use crate::error::ChatError;

use super::schema::ToolDescriptor;
use super::transport::{MCPRunningService, MCPTransport};

/// JSON-RPC code for an unimplemented method.
const METHOD_NOT_FOUND: i32 = -32601;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MCPConnectionState {
    Disconnected,
    Connected,
    Closed,
}

/// Outcome of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct MCPToolCallResult {
    /// Text items of the result, joined with newlines.
    pub text: String,
    /// Raw content items as returned by the server.
    pub content: Vec<serde_json::Value>,
}

/// Client for a Model Context Protocol server.
///
/// Owns at most one running session. `close` releases it; a closed client
/// can be connected again, which opens a new channel.
pub struct MCPClient {
    transport: Box<dyn MCPTransport>,
    session: Option<MCPRunningService>,
    state: MCPConnectionState,
}

impl MCPClient {
    /// Create a new MCP client with the given transport.
    pub fn new(transport: Box<dyn MCPTransport>) -> Self {
        Self {
            transport,
            session: None,
            state: MCPConnectionState::Disconnected,
        }
    }

    pub fn connection_state(&self) -> MCPConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == MCPConnectionState::Connected
    }

    /// Open the channel and run the initialize handshake.
    pub async fn connect(&mut self) -> Result<(), ChatError> {
        if self.is_connected() {
            return Ok(());
        }
        let session = self.connect_with_protocol_fallback().await?;
        debug!(
            endpoint = self.transport.describe(),
            server = session
                .peer_info()
                .map(|info| info.server_info.name.as_str())
                .unwrap_or("unknown"),
            "MCP session established"
        );
        self.session = Some(session);
        self.state = MCPConnectionState::Connected;
        Ok(())
    }

    /// List available tools from the MCP server.
    ///
    /// A server without tool support yields an empty list.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        let session = self.session_mut()?;

        if let Some(info) = session.peer_info() {
            if info.capabilities.tools.is_none() {
                return Ok(Vec::new());
            }
        }

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => session
                .list_tools(None)
                .await
                .map(|page| page.tools)
                .map_err(|e| map_service_error("list_tools", e))?,
            Err(ServiceError::McpError(error)) if error.code.0 == METHOD_NOT_FOUND => Vec::new(),
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool).collect())
    }

    /// Execute a tool on the MCP server.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, ChatError> {
        let session = self.session_mut()?;
        let arguments =
            coerce_tool_arguments(arguments).map_err(|message| ChatError::tool(name, message))?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| ChatError::tool(name, map_service_error("call_tool", e).to_string()))?;

        map_call_result(name, result)
    }

    /// Release the channel. Safe to call repeatedly or before `connect`.
    pub async fn close(&mut self) -> Result<(), ChatError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.state = MCPConnectionState::Closed;
        debug!(endpoint = self.transport.describe(), "closing MCP session");
        session
            .cancel()
            .await
            .map(|_| ())
            .map_err(|e| ChatError::Transport(format!("MCP session shutdown failed: {e}")))
    }

    async fn connect_with_protocol_fallback(&mut self) -> Result<MCPRunningService, ChatError> {
        let latest_client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        match self.transport.connect(latest_client_info).await {
            Ok(session) => return Ok(session),
            Err(ClientInitializeError::JsonRpcError(error)) => {
                warn!(
                    code = error.code.0,
                    "MCP initialize rejected, retrying with protocol 2024-11-05"
                );
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        }

        let fallback_client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            ..Default::default()
        };
        self.transport
            .connect(fallback_client_info)
            .await
            .map_err(map_client_initialize_error)
    }

    fn session_mut(&mut self) -> Result<&mut MCPRunningService, ChatError> {
        match self.session.as_mut() {
            Some(session) if !session.is_closed() => Ok(session),
            Some(_) => Err(ChatError::Transport("MCP session is closed".into())),
            None => Err(ChatError::NotConnected),
        }
    }
}

fn map_mcp_tool(tool: rmcp::model::Tool) -> ToolDescriptor {
    ToolDescriptor::new(
        tool.name.to_string(),
        tool.description.map(|d| d.to_string()),
        serde_json::Value::Object((*tool.input_schema).clone()),
    )
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>, String> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| format!("tool arguments must be valid JSON: {e}"))?;
            coerce_tool_arguments(parsed)
        }
        other => Err(format!("tool arguments must be a JSON object; got {other}")),
    }
}

fn extract_text_content(content: &[Content]) -> String {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }
    lines.join("\n")
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult, ChatError> {
    let text = extract_text_content(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = if text.is_empty() {
            result
                .structured_content
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "MCP tool returned an error result".into())
        } else {
            text
        };
        return Err(ChatError::tool(name, message));
    }

    let content = result
        .content
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect();

    Ok(MCPToolCallResult { text, content })
}

fn map_client_initialize_error(error: ClientInitializeError) -> ChatError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            ChatError::Transport(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => ChatError::Transport(
            format!("MCP initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => ChatError::Transport(format!(
            "MCP initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => {
            ChatError::Transport("MCP initialize cancelled".into())
        }
        other => ChatError::Transport(format!("MCP initialize error: {other}")),
    }
}

fn map_service_error(context: &str, error: ServiceError) -> ChatError {
    match error {
        ServiceError::McpError(error) => ChatError::Transport(format!(
            "{context}: MCP error {}: {}",
            error.code.0, error.message
        )),
        ServiceError::TransportSend(error) => {
            ChatError::Transport(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            ChatError::Transport(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            ChatError::Transport(format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            ChatError::Transport(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => ChatError::Transport(format!(
            "{context}: MCP request timed out after {}ms",
            timeout.as_millis()
        )),
        other => ChatError::Transport(format!("{context}: MCP service error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmcp::model::ClientInfo;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Transport whose handshake always fails with a closed connection.
    struct RefusingTransport {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MCPTransport for RefusingTransport {
        async fn connect(
            &mut self,
            _client_info: ClientInfo,
        ) -> Result<MCPRunningService, ClientInitializeError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ClientInitializeError::ConnectionClosed(
                "server exited".into(),
            ))
        }

        fn describe(&self) -> String {
            "refusing".into()
        }
    }

    fn refusing_client() -> (MCPClient, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let client = MCPClient::new(Box::new(RefusingTransport {
            attempts: Arc::clone(&attempts),
        }));
        (client, attempts)
    }

    #[test]
    fn coerce_tool_arguments_accepts_object_and_stringified_object() {
        let from_obj = coerce_tool_arguments(json!({"city":"nyc"}))
            .expect("object arguments should parse")
            .expect("object should be present");
        assert_eq!(from_obj.get("city"), Some(&json!("nyc")));

        let from_str = coerce_tool_arguments(json!(r#"{"city":"la"}"#))
            .expect("stringified object should parse")
            .expect("object should be present");
        assert_eq!(from_str.get("city"), Some(&json!("la")));
    }

    #[test]
    fn coerce_tool_arguments_rejects_non_object() {
        let err =
            coerce_tool_arguments(json!(["bad"])).expect_err("array arguments should be rejected");
        assert!(err.contains("JSON object"));
    }

    #[test]
    fn map_mcp_tool_copies_fields() {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("required".into(), json!(["city"]));
        let tool = rmcp::model::Tool::new("weather", "lookup weather", schema);

        let mapped = map_mcp_tool(tool);
        assert_eq!(mapped.name, "weather");
        assert_eq!(mapped.description.as_deref(), Some("lookup weather"));
        assert_eq!(mapped.input_schema.required, vec!["city".to_string()]);
    }

    #[tokio::test]
    async fn list_tools_requires_connection() {
        let (mut client, _) = refusing_client();
        let err = client
            .list_tools()
            .await
            .expect_err("listing tools should require connect");
        assert!(matches!(err, ChatError::NotConnected));
    }

    #[tokio::test]
    async fn connect_failure_maps_to_transport_error() {
        let (mut client, attempts) = refusing_client();
        let err = client.connect().await.expect_err("handshake should fail");
        assert!(matches!(err, ChatError::Transport(message) if message.contains("server exited")));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(client.connection_state(), MCPConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_without_session_is_noop() {
        let (mut client, _) = refusing_client();
        assert!(client.close().await.is_ok());
        assert!(client.close().await.is_ok());
        assert_eq!(client.connection_state(), MCPConnectionState::Disconnected);
    }

    #[test]
    fn map_service_error_timeout_keeps_duration() {
        let err = map_service_error(
            "call_tool",
            ServiceError::Timeout {
                timeout: Duration::from_millis(2750),
            },
        );
        assert!(matches!(err, ChatError::Transport(message) if message.contains("2750ms")));
    }

    #[test]
    fn map_call_result_joins_text_items() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "line one" },
                { "type": "text", "text": "line two" }
            ],
            "isError": false
        }))
        .expect("fixture call result should deserialize");

        let mapped = map_call_result("search", result).unwrap();
        assert_eq!(mapped.text, "line one\nline two");
        assert_eq!(mapped.content.len(), 2);
    }

    #[test]
    fn map_call_result_returns_tool_error_for_error_payload() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "tool failed at runtime" }
            ],
            "isError": true
        }))
        .expect("fixture call result should deserialize");

        let err = map_call_result("search_docs", result)
            .expect_err("error result should map to tool invocation error");
        assert!(matches!(
            err,
            ChatError::ToolInvocation { tool_name, message }
            if tool_name == "search_docs" && message.contains("failed at runtime")
        ));
    }
}
