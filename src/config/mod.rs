//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::conversation::HopPolicy;
use crate::error::ChatError;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Settings for a chat client.
///
/// Resolution order:
/// 1. Explicit setters
/// 2. Environment variables (and `.env`)
/// 3. TOML config file
/// 4. Built-in defaults
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: String,
    max_tokens: u32,
    max_hops: Option<usize>,
    reconnect_interval_secs: u64,
    server: Option<String>,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_hops", &self.max_hops)
            .field("reconnect_interval_secs", &self.reconnect_interval_secs)
            .field("server", &self.server)
            .finish()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatConfig {
    /// Create a config holding only built-in defaults.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_hops: None,
            reconnect_interval_secs: DEFAULT_RECONNECT_INTERVAL.as_secs(),
            server: None,
        }
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, ChatError> {
        let mut config = Self::new();
        config.apply_env()?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn load_file(path: &Path) -> Result<Self, ChatError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            ChatError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Default config file location (`<config dir>/mcp-chat/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mcp-chat")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the full layered config.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ChatError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_file(&path)?,
                _ => Self::new(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables onto this config.
    pub fn apply_env(&mut self) -> Result<(), ChatError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("MCP_CHAT_MODEL") {
            self.model = model;
        }
        if let Ok(raw) = std::env::var("MCP_CHAT_MAX_TOKENS") {
            self.max_tokens = parse_env("MCP_CHAT_MAX_TOKENS", &raw)?;
        }
        if let Ok(raw) = std::env::var("MCP_CHAT_MAX_HOPS") {
            self.max_hops = Some(parse_env("MCP_CHAT_MAX_HOPS", &raw)?);
        }
        if let Ok(server) = std::env::var("MCP_CHAT_SERVER") {
            self.server = Some(server);
        }
        Ok(())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// `0` restores the single follow-up behaviour.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = Some(max_hops);
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn hop_policy(&self) -> HopPolicy {
        HopPolicy::from_max_hops(self.max_hops)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ChatError>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ChatError::Configuration(format!("{name}={raw:?} is invalid: {e}")))
}
