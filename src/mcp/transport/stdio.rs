use std::path::Path;

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;
use tracing::debug;

use super::{MCPRunningService, MCPTransport};
use crate::error::ChatError;
use crate::mcp::target::LaunchCommand;

/// Stdio-based MCP transport (for local MCP servers).
///
/// Each `connect` spawns a new child process; dropping the running service
/// kills it.
pub struct StdioTransport {
    command: LaunchCommand,
}

impl StdioTransport {
    pub fn new(command: LaunchCommand) -> Self {
        Self { command }
    }

    /// Build the transport for a server script.
    ///
    /// Fails with `UnsupportedScriptKind` without spawning anything when the
    /// extension is not recognized.
    pub fn for_script(path: &Path) -> Result<Self, ChatError> {
        LaunchCommand::for_script(path).map(Self::new)
    }

    pub fn command(&self) -> &LaunchCommand {
        &self.command
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        debug!(command = %self.command, "spawning MCP server process");

        let mut command = Command::new(&self.command.program);
        command.args(&self.command.args);
        let transport = TokioChildProcess::new(command).map_err(|error| {
            ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
        })?;

        client_info.into_dyn().serve(transport).await
    }

    fn describe(&self) -> String {
        self.command.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_script_keeps_resolved_command() {
        let transport = StdioTransport::for_script(Path::new("server.js")).unwrap();
        assert_eq!(transport.command().program, "node");
        assert_eq!(transport.describe(), "node server.js");
    }

    #[test]
    fn for_script_rejects_unknown_extension() {
        let err = match StdioTransport::for_script(Path::new("server.sh")) {
            Ok(_) => panic!("shell scripts are not supported"),
            Err(err) => err,
        };
        assert!(matches!(err, ChatError::UnsupportedScriptKind { .. }));
    }

    #[tokio::test]
    async fn connect_reports_missing_runtime_as_error() {
        let mut transport = StdioTransport::new(LaunchCommand {
            program: "mcp-chat-runtime-that-does-not-exist".into(),
            args: vec!["server.js".into()],
        });
        let result = transport.connect(ClientInfo::default()).await;
        assert!(result.is_err());
    }
}
