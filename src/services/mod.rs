//! Service layer
//!
//! Credential pool management, the completion gateway, the client-side
//! stream consumer, and background title generation

pub mod consumer;
pub mod gateway;
pub mod keypool;
pub mod title;

pub use consumer::{create_streaming_chat_completion, ChatStreamClient, StreamChunkReader};
pub use gateway::{is_failover_eligible, CompletionGateway};
pub use keypool::{Credential, CredentialPool};
pub use title::{generate_chat_title, spawn_title_generation, FALLBACK_TITLE};
