//! How far the orchestrator follows tool calls.

use serde::{Deserialize, Serialize};

/// Tool-call depth policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HopPolicy {
    /// Each tool call gets exactly one follow-up completion, made without
    /// tools. The follow-up can never request another tool.
    #[default]
    SingleFollowUp,
    /// Keep asking the model (with tools) until it stops requesting them,
    /// failing after `max_hops` rounds of tool execution.
    MultiHop { max_hops: usize },
}

impl HopPolicy {
    /// `Some(n)` with `n > 0` selects multi-hop; anything else the default.
    pub fn from_max_hops(max_hops: Option<usize>) -> Self {
        match max_hops {
            Some(max_hops) if max_hops > 0 => Self::MultiHop { max_hops },
            _ => Self::SingleFollowUp,
        }
    }
}
