//! Model Context Protocol (MCP) client, transports and tool catalog.

pub mod client;
pub mod connector;
pub mod schema;
pub mod target;
pub mod transport;

pub use client::{MCPClient, MCPConnectionState, MCPToolCallResult};
pub use connector::{Connector, MCPConnector, ToolServer};
pub use schema::{load_tools, InputSchema, ToolDescriptor};
pub use target::{LaunchCommand, ServerTarget};
pub use transport::{MCPTransport, StdioTransport, StreamableHttpTransport};
