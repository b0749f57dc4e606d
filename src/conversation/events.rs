//! Conversation event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one `process_query` call.
pub type QueryId = Uuid;

/// Observable connection state of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { tool_count: usize },
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Connecting {
        target: String,
    },
    Connected {
        target: String,
        tools: Vec<String>,
    },
    Disconnected,
    QueryStarted {
        query_id: QueryId,
        query: String,
    },
    ToolCallStarted {
        query_id: QueryId,
        tool_name: String,
        arguments: serde_json::Value,
    },
    ToolCallCompleted {
        query_id: QueryId,
        tool_name: String,
        result: String,
    },
    AnswerReady {
        query_id: QueryId,
        answer: String,
    },
    Error {
        query_id: Option<QueryId>,
        message: String,
    },
}

/// Envelope carrying ordering metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEventEnvelope {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: ChatEvent,
}

/// Callback used for streaming conversation events.
pub type ChatEventSink = Arc<dyn Fn(ChatEventEnvelope) + Send + Sync>;

pub(crate) struct EventEmitter {
    seq: AtomicU64,
    sink: Option<ChatEventSink>,
}

impl EventEmitter {
    pub(crate) fn new(sink: Option<ChatEventSink>) -> Self {
        Self {
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, event: ChatEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(ChatEventEnvelope {
            seq,
            timestamp: Utc::now(),
            event,
        });
    }
}
