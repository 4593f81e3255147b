//! Data models module
//!
//! Defines conversation, wire-format, and SSE protocol data structures

pub mod chat;
pub mod openrouter;
pub mod wire;

pub use chat::{ChatMessage, CompletionOutcome, Role, TokenUsage};
pub use wire::StreamFrame;
