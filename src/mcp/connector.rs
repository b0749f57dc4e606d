//! Opening tool-server channels from a [`ServerTarget`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::client::{MCPClient, MCPToolCallResult};
use super::schema::ToolDescriptor;
use super::target::ServerTarget;
use super::transport::{MCPTransport, StdioTransport, StreamableHttpTransport};
use crate::config::DEFAULT_RECONNECT_INTERVAL;
use crate::error::ChatError;

/// An open channel to a tool server.
#[async_trait]
pub trait ToolServer: Send {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, ChatError>;

    /// Release the channel. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), ChatError>;
}

#[async_trait]
impl ToolServer for MCPClient {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        MCPClient::list_tools(self).await
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult, ChatError> {
        MCPClient::call_tool(self, name, arguments).await
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        MCPClient::close(self).await
    }
}

/// Produces connected [`ToolServer`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ServerTarget) -> Result<Box<dyn ToolServer>, ChatError>;
}

/// Connector backed by real MCP transports.
#[derive(Debug, Clone)]
pub struct MCPConnector {
    reconnect_interval: Duration,
}

impl MCPConnector {
    pub fn new() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Pick a transport for the target.
    ///
    /// Local targets are classified here, so an unsupported script fails
    /// before any process is spawned.
    pub fn transport_for(&self, target: &ServerTarget) -> Result<Box<dyn MCPTransport>, ChatError> {
        Ok(match target {
            ServerTarget::Local(path) => Box::new(StdioTransport::for_script(path)?),
            ServerTarget::Remote(url) => Box::new(
                StreamableHttpTransport::new(url.clone())
                    .reconnect_interval(self.reconnect_interval),
            ),
        })
    }
}

impl Default for MCPConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MCPConnector {
    async fn connect(&self, target: &ServerTarget) -> Result<Box<dyn ToolServer>, ChatError> {
        let transport = self.transport_for(target)?;
        let mut client = MCPClient::new(transport);
        client.connect().await?;
        info!(target = %target, "connected to MCP server");
        Ok(Box::new(client))
    }
}
