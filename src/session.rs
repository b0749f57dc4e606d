//! Chat session: the surface a chat front end drives.
//!
//! A [`ChatSession`] serializes queries against one [`Orchestrator`] and
//! keeps the transcript a UI would render, including loading placeholders
//! and error entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::conversation::{ConnectionState, Orchestrator};
use crate::error::ChatError;
use crate::mcp::ServerTarget;

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub is_user: bool,
    pub is_loading: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(text.into(), true, false)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::build(text.into(), false, false)
    }

    /// Placeholder shown while a query runs.
    pub fn loading() -> Self {
        Self::build(String::new(), false, true)
    }

    fn build(text: String, is_user: bool, is_loading: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            is_user,
            is_loading,
            timestamp: Utc::now(),
        }
    }
}

/// Owns an orchestrator and the transcript shown to the user.
pub struct ChatSession {
    orchestrator: Mutex<Orchestrator>,
    transcript: Mutex<Vec<ChatMessage>>,
    last_target: Mutex<Option<ServerTarget>>,
    connection_error: Mutex<Option<String>>,
}

impl ChatSession {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Mutex::new(orchestrator),
            transcript: Mutex::new(Vec::new()),
            last_target: Mutex::new(None),
            connection_error: Mutex::new(None),
        }
    }

    /// Connect to `server` (a script path or an HTTP(S) URL).
    ///
    /// A failure leaves an error entry in the transcript and is kept in
    /// [`connection_error`](Self::connection_error) until a later connect
    /// succeeds.
    pub async fn connect(&self, server: &str) -> Result<(), ChatError> {
        let target = ServerTarget::parse(server);
        *self.last_target.lock().await = Some(target.clone());
        self.push(ChatMessage::assistant("Connecting to server...")).await;

        let result = self.orchestrator.lock().await.connect(&target).await;
        match &result {
            Ok(()) => {
                *self.connection_error.lock().await = None;
                self.push(ChatMessage::assistant(
                    "Connected to server! Ask a question.",
                ))
                .await;
            }
            Err(error) => {
                let message = format!("MCP server connection failed: {error}");
                *self.connection_error.lock().await = Some(message.clone());
                self.push(ChatMessage::assistant(message)).await;
                self.push(ChatMessage::assistant(format!(
                    "Check that the server is running at '{target}'."
                )))
                .await;
            }
        }
        result
    }

    /// Connect again to the last target passed to [`connect`](Self::connect).
    pub async fn retry_connect(&self) -> Result<(), ChatError> {
        let target = self.last_target.lock().await.clone().ok_or_else(|| {
            ChatError::InvalidArgument("no server has been connected yet".into())
        })?;
        self.connect(&target.to_string()).await
    }

    /// Run one query. Blank input is rejected without touching the transcript.
    pub async fn process_query(&self, text: &str) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::InvalidArgument("query is empty".into()));
        }

        self.push(ChatMessage::user(text)).await;
        let placeholder = ChatMessage::loading();
        let placeholder_id = placeholder.id;
        self.push(placeholder).await;

        let result = self.orchestrator.lock().await.process_query(text).await;
        let reply = match &result {
            Ok(answer) => ChatMessage::assistant(answer.clone()),
            Err(error) => ChatMessage::assistant(format!("Error: {error}")),
        };
        self.replace(placeholder_id, reply).await;
        result
    }

    pub async fn close(&self) {
        self.orchestrator.lock().await.close().await;
        debug!("chat session closed");
    }

    pub async fn state(&self) -> ConnectionState {
        self.orchestrator.lock().await.state()
    }

    /// Message of the last failed connect, cleared on success.
    pub async fn connection_error(&self) -> Option<String> {
        self.connection_error.lock().await.clone()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }

    pub async fn clear_transcript(&self) {
        self.transcript.lock().await.clear();
    }

    async fn push(&self, message: ChatMessage) {
        self.transcript.lock().await.push(message);
    }

    async fn replace(&self, id: Uuid, message: ChatMessage) {
        let mut transcript = self.transcript.lock().await;
        match transcript.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => *entry = message,
            None => transcript.push(message),
        }
    }
}
