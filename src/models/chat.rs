//! Conversation data models
//!
//! Defines the gateway-boundary message and result types

use serde::{Deserialize, Serialize};

/// Conversation message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User turn
    User,
    /// Assistant turn
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI-shaped APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single conversation message
///
/// Ordering is significant; identity and persistence belong to the
/// storage layer, not the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Token usage statistics reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}

/// Outcome of a completion request
///
/// Expected provider and network failures are carried as `Failure`;
/// the gateway never propagates them as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The provider returned a completion
    Success {
        /// Assistant message text
        message: String,
        /// Usage statistics, when the provider reports them
        usage: Option<TokenUsage>,
    },
    /// The request failed after routing and retries
    Failure {
        /// Human-readable error text, suitable for user display
        error: String,
    },
}

impl CompletionOutcome {
    /// Build a failure outcome from any displayable error
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    /// True when the outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
