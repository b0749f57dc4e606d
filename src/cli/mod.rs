//! Command-line interface for mcp-chat.

use std::path::PathBuf;

use clap::Parser;

use crate::config::ChatConfig;

/// Server used when neither the command line nor the config names one.
pub const DEFAULT_SERVER: &str = "http://localhost:3001";

/// Chat with an LLM that can call tools on an MCP server
#[derive(Parser, Debug)]
#[command(name = "mcp-chat", version, about = "Chat with an LLM backed by MCP tools")]
pub struct Cli {
    /// Server script (.js, .py, .jar) or HTTP(S) URL
    pub server: Option<String>,

    /// Model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Max tokens per completion
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Follow tool calls for up to N rounds (default: one follow-up per call)
    #[arg(long, value_name = "N")]
    pub max_hops: Option<usize>,

    /// Config file (default: <config dir>/mcp-chat/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ask a single question and exit
    #[arg(short, long)]
    pub query: Option<String>,
}

impl Cli {
    /// Layer command-line overrides on top of a loaded config.
    pub fn apply(&self, mut config: ChatConfig) -> ChatConfig {
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(max_hops) = self.max_hops {
            config = config.with_max_hops(max_hops);
        }
        if let Some(server) = &self.server {
            config = config.with_server(server.clone());
        }
        config
    }
}

/// Server to connect to, falling back to [`DEFAULT_SERVER`].
pub fn resolve_server(config: &ChatConfig) -> String {
    config.server().unwrap_or(DEFAULT_SERVER).to_string()
}

/// `quit` in any letter case ends the interactive loop.
pub fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::HopPolicy;

    #[test]
    fn parses_positional_server_and_flags() {
        let cli = Cli::parse_from([
            "mcp-chat",
            "./weather.py",
            "--model",
            "claude-test",
            "--max-hops",
            "3",
            "-q",
            "weather?",
        ]);
        assert_eq!(cli.server.as_deref(), Some("./weather.py"));
        assert_eq!(cli.query.as_deref(), Some("weather?"));

        let config = cli.apply(ChatConfig::new());
        assert_eq!(config.model(), "claude-test");
        assert_eq!(config.hop_policy(), HopPolicy::MultiHop { max_hops: 3 });
        assert_eq!(resolve_server(&config), "./weather.py");
    }

    #[test]
    fn server_defaults_to_localhost() {
        let cli = Cli::parse_from(["mcp-chat"]);
        let config = cli.apply(ChatConfig::new());
        assert_eq!(resolve_server(&config), DEFAULT_SERVER);
    }

    #[test]
    fn quit_is_case_insensitive() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command("  QUIT \n"));
        assert!(is_quit_command("Quit"));
        assert!(!is_quit_command("quit now"));
        assert!(!is_quit_command(""));
    }
}
