//! Completion gateway
//!
//! Single entry point for all completion call sites. Resolves the
//! adapter for a model identifier, attempts the call, and on transient
//! failure rotates the credential pool and retries, bounded by a
//! max-attempts policy.

use crate::config::Settings;
use crate::models::chat::{ChatMessage, CompletionOutcome};
use crate::providers::{
    resolve_route, AnthropicProvider, GoogleProvider, ModelRoute, OpenAiProvider,
    OpenRouterProvider, Provider, ProviderError, TokenStream, Vendor,
};
use crate::services::keypool::CredentialPool;
use crate::utils::error::{AppError, AppResult};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP statuses treated as "maybe this credential is exhausted"
const FAILOVER_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Error-text markers treated the same way. The aggregator is known to
/// return a generic 500 for what is actually a per-key rate limit, so
/// the check is deliberately broad: cycling away from a healthy key on a
/// genuine 500 is the accepted cheaper failure mode.
const FAILOVER_MARKERS: [&str; 7] =
    ["500", "429", "rate limit", "quota", "limit exceeded", "server error", "API"];

/// Classify whether an error should trigger credential rotation.
///
/// Kept as a single named predicate so it can be swapped for a stricter
/// status-code-only check if the upstream ever returns distinguishable
/// error codes.
pub fn is_failover_eligible(error: &ProviderError) -> bool {
    match error {
        ProviderError::Http { status, body } => {
            FAILOVER_STATUSES.contains(status)
                || FAILOVER_MARKERS.iter().any(|marker| body.contains(marker))
        }
        ProviderError::StreamingUnsupported => false,
        other => {
            let text = other.to_string();
            FAILOVER_MARKERS.iter().any(|marker| text.contains(marker))
        }
    }
}

/// Completion gateway facade
///
/// Adapters are injected as trait objects so tests can substitute mocks
/// and count attempts.
pub struct CompletionGateway {
    pool: Arc<CredentialPool>,
    aggregator: Arc<dyn Provider>,
    openai: Arc<dyn Provider>,
    anthropic: Arc<dyn Provider>,
    google: Arc<dyn Provider>,
    max_retries: u32,
}

impl CompletionGateway {
    /// Create a gateway wired to the real providers
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            pool: Arc::new(CredentialPool::new(settings.openrouter.api_keys.clone())),
            aggregator: Arc::new(OpenRouterProvider::new(settings)?),
            openai: Arc::new(OpenAiProvider::new(settings)?),
            anthropic: Arc::new(AnthropicProvider::new(settings)?),
            google: Arc::new(GoogleProvider::new(settings)?),
            max_retries: settings.gateway.max_retries,
        })
    }

    /// Create a gateway from explicit parts (tests and embedding)
    pub fn with_parts(
        pool: Arc<CredentialPool>,
        aggregator: Arc<dyn Provider>,
        openai: Arc<dyn Provider>,
        anthropic: Arc<dyn Provider>,
        google: Arc<dyn Provider>,
        max_retries: u32,
    ) -> Self {
        Self { pool, aggregator, openai, anthropic, google, max_retries }
    }

    /// The credential pool backing aggregator completions
    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    fn byok_adapter(&self, vendor: Vendor) -> &Arc<dyn Provider> {
        match vendor {
            Vendor::OpenAi => &self.openai,
            Vendor::Anthropic => &self.anthropic,
            Vendor::Google => &self.google,
        }
    }

    /// Non-streaming completion
    ///
    /// Expected provider failures come back as `Failure`; this never
    /// returns `Err` and never panics for upstream misbehavior.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model_id: &str,
        byok_key: Option<&str>,
    ) -> CompletionOutcome {
        match resolve_route(model_id) {
            None => CompletionOutcome::failure(AppError::UnroutableModel.to_string()),
            Some(ModelRoute::Free) => self.complete_via_pool(messages, model_id).await,
            Some(ModelRoute::Byok(vendor)) => {
                self.complete_byok(messages, model_id, vendor, byok_key).await
            }
        }
    }

    /// Aggregator completion with credential rotation
    async fn complete_via_pool(&self, messages: &[ChatMessage], model_id: &str) -> CompletionOutcome {
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=self.max_retries {
            let credential = match self.pool.current_credential() {
                Ok(credential) => credential,
                Err(e) => return CompletionOutcome::failure(e.to_string()),
            };

            debug!("Completion attempt {}/{} with key #{}", attempt, self.max_retries, credential.index + 1);

            match self.aggregator.complete(messages, model_id, &credential.secret).await {
                Ok(completion) => {
                    return CompletionOutcome::Success {
                        message: completion.message,
                        usage: completion.usage,
                    };
                }
                Err(e) => {
                    if !is_failover_eligible(&e) {
                        return CompletionOutcome::failure(e.to_string());
                    }

                    warn!("Attempt {}/{} failed, rotating credential: {}", attempt, self.max_retries, e);
                    if attempt < self.max_retries {
                        if let Err(pool_err) = self.pool.cycle_to_next() {
                            return CompletionOutcome::failure(pool_err.to_string());
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error occurred.".to_string());
        CompletionOutcome::failure(message)
    }

    /// BYOK completion: single attempt, no rotation
    async fn complete_byok(
        &self,
        messages: &[ChatMessage],
        model_id: &str,
        vendor: Vendor,
        byok_key: Option<&str>,
    ) -> CompletionOutcome {
        let key = match byok_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => return CompletionOutcome::failure(vendor.missing_key_message()),
        };

        match self.byok_adapter(vendor).complete(messages, model_id, key).await {
            Ok(completion) => CompletionOutcome::Success {
                message: completion.message,
                usage: completion.usage,
            },
            Err(e) => CompletionOutcome::failure(e.to_string()),
        }
    }

    /// Streaming completion
    ///
    /// Follows the same routing and retry rules as `complete`, but only
    /// the aggregator supports streaming in this version; BYOK model
    /// identifiers are rejected up front.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        model_id: &str,
    ) -> AppResult<TokenStream> {
        match resolve_route(model_id) {
            None => Err(AppError::UnroutableModel),
            Some(ModelRoute::Byok(_)) => Err(AppError::Unsupported(
                "Streaming is only supported for free models in this version.".to_string(),
            )),
            Some(ModelRoute::Free) => {
                let mut last_error: Option<ProviderError> = None;

                for attempt in 1..=self.max_retries {
                    let credential = self.pool.current_credential()?;

                    debug!(
                        "Streaming attempt {}/{} with key #{}",
                        attempt,
                        self.max_retries,
                        credential.index + 1
                    );

                    match self
                        .aggregator
                        .complete_stream(messages, model_id, &credential.secret)
                        .await
                    {
                        Ok(stream) => return Ok(stream),
                        Err(e) => {
                            if !is_failover_eligible(&e) {
                                return Err(AppError::Upstream(e.to_string()));
                            }

                            warn!(
                                "Streaming attempt {}/{} failed, rotating credential: {}",
                                attempt, self.max_retries, e
                            );
                            if attempt < self.max_retries {
                                self.pool.cycle_to_next()?;
                            }
                            last_error = Some(e);
                        }
                    }
                }

                let message = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error occurred.".to_string());
                Err(AppError::Upstream(message))
            }
        }
    }
}
