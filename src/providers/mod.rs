//! Provider module
//!
//! Defines the Provider trait, model-identifier routing, and the
//! adapter implementations for each upstream backend family

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod openrouter;

use crate::models::chat::{ChatMessage, TokenUsage};
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// A boxed stream of incremental text deltas from a provider
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send + 'static>>;

/// Error raised by a provider adapter for a single upstream call
///
/// Non-2xx responses keep the raw body text so the gateway's failover
/// heuristic can inspect it.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Upstream returned a non-2xx status
    #[error("API request failed: {status} - {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Raw response body text
        body: String,
    },

    /// Transport-level failure before a status was received
    #[error("Request failed: {0}")]
    Network(String),

    /// The upstream body could not be decoded
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The adapter does not support streaming
    #[error("Streaming is only supported for free models in this version.")]
    StreamingUnsupported,
}

impl ProviderError {
    /// Build a network error from a reqwest failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// A materialized completion from a provider
#[derive(Debug, Clone)]
pub struct Completion {
    /// Assistant message text
    pub message: String,
    /// Usage statistics, when reported
    pub usage: Option<TokenUsage>,
}

/// Provider trait for upstream LLM backends
///
/// Each adapter translates a `(messages, model, credential)` triple into
/// exactly one upstream call. Streaming is optional; adapters that do
/// not support it inherit the default rejection.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a chat completion request (non-streaming)
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError>;

    /// Send a chat completion request (streaming)
    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
        _credential: &str,
    ) -> Result<TokenStream, ProviderError> {
        Err(ProviderError::StreamingUnsupported)
    }
}

/// Native bring-your-own-key vendor families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    /// OpenAI native API
    OpenAi,
    /// Anthropic native API
    Anthropic,
    /// Google Gemini native API
    Google,
}

impl Vendor {
    /// Model-identifier prefix claimed by this vendor
    pub fn prefix(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai/",
            Vendor::Anthropic => "anthropic/",
            Vendor::Google => "google/",
        }
    }

    /// Terminal error message when the caller supplied no key
    pub fn missing_key_message(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "No OpenAI API key set.",
            Vendor::Anthropic => "No Anthropic API key set.",
            Vendor::Google => "No Google API key set.",
        }
    }

    /// All vendor variants, in routing precedence order
    pub const ALL: [Vendor; 3] = [Vendor::OpenAi, Vendor::Anthropic, Vendor::Google];
}

/// Routing class of a model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRoute {
    /// Free-tier aggregator, credential pool managed
    Free,
    /// Native vendor with a caller-supplied key
    Byok(Vendor),
}

/// Resolve a model identifier to its routing class
///
/// Routing is a pure function of the identifier's prefix and suffix:
/// suffix `:free` wins first, then a known vendor prefix combined with
/// suffix `:byok`. Anything else is unroutable.
pub fn resolve_route(model_id: &str) -> Option<ModelRoute> {
    if model_id.ends_with(":free") {
        return Some(ModelRoute::Free);
    }

    if model_id.ends_with(":byok") {
        for vendor in Vendor::ALL {
            if model_id.starts_with(vendor.prefix()) {
                return Some(ModelRoute::Byok(vendor));
            }
        }
    }

    None
}

/// Strip the vendor prefix and `:byok` suffix to get the model name the
/// native API expects (`openai/gpt-4o:byok` -> `gpt-4o`)
pub fn native_model_name<'a>(model_id: &'a str, vendor: Vendor) -> &'a str {
    let name = model_id.strip_prefix(vendor.prefix()).unwrap_or(model_id);
    name.strip_suffix(":byok").unwrap_or(name)
}

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_suffix_routes_to_aggregator() {
        assert_eq!(resolve_route("google/gemini-2.0-flash-exp:free"), Some(ModelRoute::Free));
        assert_eq!(resolve_route("deepseek/deepseek-chat-v3-0324:free"), Some(ModelRoute::Free));
    }

    #[test]
    fn test_free_suffix_wins_over_vendor_prefix() {
        // google/ is also a BYOK prefix; :free must take precedence
        assert_eq!(resolve_route("google/gemma-3-27b-it:free"), Some(ModelRoute::Free));
    }

    #[test]
    fn test_byok_routing() {
        assert_eq!(resolve_route("openai/gpt-4o:byok"), Some(ModelRoute::Byok(Vendor::OpenAi)));
        assert_eq!(
            resolve_route("anthropic/claude-4-sonnet:byok"),
            Some(ModelRoute::Byok(Vendor::Anthropic))
        );
        assert_eq!(
            resolve_route("google/gemini-2.5-pro:byok"),
            Some(ModelRoute::Byok(Vendor::Google))
        );
    }

    #[test]
    fn test_unroutable_identifiers() {
        assert_eq!(resolve_route("gpt-4o"), None);
        assert_eq!(resolve_route("mistralai/devstral-small:byok"), None);
        assert_eq!(resolve_route("openai/gpt-4o"), None);
    }

    #[test]
    fn test_native_model_name() {
        assert_eq!(native_model_name("openai/gpt-4o:byok", Vendor::OpenAi), "gpt-4o");
        assert_eq!(
            native_model_name("anthropic/claude-4-sonnet:byok", Vendor::Anthropic),
            "claude-4-sonnet"
        );
    }

    #[test]
    fn test_missing_key_messages() {
        assert_eq!(Vendor::OpenAi.missing_key_message(), "No OpenAI API key set.");
        assert_eq!(Vendor::Anthropic.missing_key_message(), "No Anthropic API key set.");
        assert_eq!(Vendor::Google.missing_key_message(), "No Google API key set.");
    }
}
