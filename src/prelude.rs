//! Convenience re-exports for common use.

pub use crate::config::ChatConfig;
pub use crate::conversation::{
    ChatEvent, ChatEventSink, ConnectionState, HopPolicy, Orchestrator, OrchestratorSettings,
};
pub use crate::error::{ChatError, Result};
pub use crate::mcp::{Connector, MCPConnector, ServerTarget, ToolServer};
pub use crate::provider::{MessageRequest, MessageResponse, ModelProvider, ToolUnion};
pub use crate::session::{ChatMessage, ChatSession};
pub use crate::types::{ContentBlock, Message, Role, ToolResult, ToolUse};
