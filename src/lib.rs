//! mcp-chat: relay chat queries between an LLM and an MCP tool server.
//!
//! The [`conversation::Orchestrator`] sends a query to the model together
//! with the tools of the connected server, runs the tool calls the model
//! asks for, and feeds the results back for a follow-up answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use mcp_chat::prelude::*;
//!
//! # async fn example() -> mcp_chat::error::Result<()> {
//! let config = ChatConfig::load(None)?;
//! let mut orchestrator = Orchestrator::from_config(&config)?;
//! orchestrator.connect(&ServerTarget::parse("./weather.py")).await?;
//! let answer = orchestrator.process_query("What's the weather in Paris?").await?;
//! println!("{answer}");
//! orchestrator.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod mcp;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
