//! MCP transport layer.

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService};

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// A way of reaching a tool server.
///
/// Every call to `connect` opens a fresh channel and runs the MCP
/// initialize handshake over it.
#[async_trait]
pub trait MCPTransport: Send {
    /// Create and initialize a new rmcp running service for this transport.
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError>;

    /// Human-readable endpoint, for logs.
    fn describe(&self) -> String;
}

mod stdio;
mod streamable_http;

pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;
