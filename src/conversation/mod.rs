//! Conversation orchestration: the model/tool protocol and its events.

pub mod events;
pub mod hops;
pub mod orchestrator;

pub use events::{ChatEvent, ChatEventEnvelope, ChatEventSink, ConnectionState, QueryId};
pub use hops::HopPolicy;
pub use orchestrator::{trace_line, Orchestrator, OrchestratorSettings};
