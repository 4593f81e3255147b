//! Chat Gateway Library
//!
//! Multi-provider LLM completion gateway with credential pool rotation,
//! model-identifier routing, and a normalized SSE stream protocol

pub mod config;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, AppState};
pub use models::{ChatMessage, CompletionOutcome, Role, StreamFrame, TokenUsage};
pub use providers::{resolve_route, ModelRoute, Provider, ProviderError, Vendor};
pub use services::{
    is_failover_eligible, ChatStreamClient, CompletionGateway, CredentialPool, StreamChunkReader,
};
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
