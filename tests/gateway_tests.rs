//! Completion gateway behavior tests
//!
//! Uses scripted provider doubles to pin down routing, the retry loop,
//! and the terminal-versus-failover error split without any network.

use async_trait::async_trait;
use chatgateway::models::chat::{ChatMessage, CompletionOutcome};
use chatgateway::providers::{Completion, Provider, ProviderError, TokenStream};
use chatgateway::services::{CompletionGateway, CredentialPool};
use chatgateway::AppError;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider double that replays a scripted sequence of outcomes
///
/// Once the script is exhausted every further call succeeds.
struct ScriptedProvider {
    calls: AtomicUsize,
    credentials_seen: Mutex<Vec<String>>,
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    stream_script: Mutex<VecDeque<Result<Vec<&'static str>, ProviderError>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<Completion, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            credentials_seen: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
            stream_script: Mutex::new(VecDeque::new()),
        })
    }

    fn with_stream_script(
        script: Vec<Result<Vec<&'static str>, ProviderError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            credentials_seen: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            stream_script: Mutex::new(script.into()),
        })
    }

    fn always_ok() -> Arc<Self> {
        Self::new(vec![])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn credentials_seen(&self) -> Vec<String> {
        self.credentials_seen.lock().unwrap().clone()
    }
}

fn ok_completion(text: &str) -> Result<Completion, ProviderError> {
    Ok(Completion { message: text.to_string(), usage: None })
}

fn http_err(status: u16, body: &str) -> Result<Completion, ProviderError> {
    Err(ProviderError::Http { status, body: body.to_string() })
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials_seen.lock().unwrap().push(credential.to_string());

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok_completion("ok"))
    }

    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
        credential: &str,
    ) -> Result<TokenStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials_seen.lock().unwrap().push(credential.to_string());

        match self.stream_script.lock().unwrap().pop_front() {
            Some(Ok(tokens)) => {
                let items: Vec<Result<String, ProviderError>> =
                    tokens.into_iter().map(|t| Ok(t.to_string())).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Some(Err(e)) => Err(e),
            None => Ok(Box::pin(futures::stream::empty())),
        }
    }
}

fn pool_of(keys: &[&str]) -> Arc<CredentialPool> {
    Arc::new(CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()))
}

fn gateway_with(
    pool: Arc<CredentialPool>,
    aggregator: Arc<ScriptedProvider>,
    openai: Arc<ScriptedProvider>,
) -> CompletionGateway {
    CompletionGateway::with_parts(
        pool,
        aggregator,
        openai,
        ScriptedProvider::always_ok(),
        ScriptedProvider::always_ok(),
        5,
    )
}

fn user_messages() -> Vec<ChatMessage> {
    vec![ChatMessage::user("Hello")]
}

#[tokio::test]
async fn test_unroutable_model_fails_without_provider_call() {
    let aggregator = ScriptedProvider::always_ok();
    let openai = ScriptedProvider::always_ok();
    let gateway = gateway_with(pool_of(&["sk-1"]), Arc::clone(&aggregator), Arc::clone(&openai));

    let outcome = gateway.complete(&user_messages(), "gpt-4o", None).await;

    assert_eq!(outcome, CompletionOutcome::failure("Unknown model provider."));
    assert_eq!(aggregator.calls(), 0);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn test_free_model_succeeds_first_attempt() {
    let aggregator = ScriptedProvider::new(vec![ok_completion("Hi there")]);
    let gateway = gateway_with(
        pool_of(&["sk-1", "sk-2"]),
        Arc::clone(&aggregator),
        ScriptedProvider::always_ok(),
    );

    let outcome = gateway
        .complete(&user_messages(), "google/gemini-2.0-flash-exp:free", None)
        .await;

    match outcome {
        CompletionOutcome::Success { message, .. } => assert_eq!(message, "Hi there"),
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(aggregator.calls(), 1);
    assert_eq!(aggregator.credentials_seen(), vec!["sk-1"]);
}

#[tokio::test]
async fn test_failover_errors_rotate_and_retry() {
    let aggregator = ScriptedProvider::new(vec![
        http_err(500, "Internal Server Error"),
        http_err(429, "Too Many Requests"),
        ok_completion("recovered"),
    ]);
    let gateway = gateway_with(
        pool_of(&["sk-1", "sk-2", "sk-3"]),
        Arc::clone(&aggregator),
        ScriptedProvider::always_ok(),
    );

    let outcome = gateway
        .complete(&user_messages(), "deepseek/deepseek-chat-v3-0324:free", None)
        .await;

    assert!(outcome.is_success());
    assert_eq!(aggregator.calls(), 3);
    // Each failed attempt moved to the next slot
    assert_eq!(aggregator.credentials_seen(), vec!["sk-1", "sk-2", "sk-3"]);
}

#[tokio::test]
async fn test_retry_budget_exhaustion_returns_last_error() {
    let aggregator = ScriptedProvider::new(vec![
        http_err(500, "boom 1"),
        http_err(500, "boom 2"),
        http_err(500, "boom 3"),
        http_err(500, "boom 4"),
        http_err(500, "boom 5"),
    ]);
    let gateway = gateway_with(
        pool_of(&["sk-1", "sk-2", "sk-3"]),
        Arc::clone(&aggregator),
        ScriptedProvider::always_ok(),
    );

    let outcome = gateway
        .complete(&user_messages(), "meta-llama/llama-3.3-70b-instruct:free", None)
        .await;

    assert_eq!(aggregator.calls(), 5);
    match outcome {
        CompletionOutcome::Failure { error } => assert!(error.contains("boom 5")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_terminal_error_returns_immediately() {
    let aggregator = ScriptedProvider::new(vec![http_err(400, "bad request shape")]);
    let gateway = gateway_with(
        pool_of(&["sk-1", "sk-2"]),
        Arc::clone(&aggregator),
        ScriptedProvider::always_ok(),
    );

    let outcome = gateway
        .complete(&user_messages(), "google/gemma-3-27b-it:free", None)
        .await;

    assert_eq!(aggregator.calls(), 1);
    assert!(matches!(outcome, CompletionOutcome::Failure { .. }));
    // The untouched second key is still the pool's next choice
    let gateway_pool = gateway.pool();
    assert_eq!(gateway_pool.current_credential().unwrap().index, 0);
}

#[tokio::test]
async fn test_empty_pool_fails_free_model() {
    let aggregator = ScriptedProvider::always_ok();
    let gateway = gateway_with(pool_of(&[]), Arc::clone(&aggregator), ScriptedProvider::always_ok());

    let outcome = gateway
        .complete(&user_messages(), "google/gemini-2.0-flash-exp:free", None)
        .await;

    assert_eq!(outcome, CompletionOutcome::failure("No OpenRouter API keys are configured"));
    assert_eq!(aggregator.calls(), 0);
}

#[tokio::test]
async fn test_byok_routes_to_vendor_adapter() {
    let aggregator = ScriptedProvider::always_ok();
    let openai = ScriptedProvider::new(vec![ok_completion("from openai")]);
    let gateway = gateway_with(pool_of(&["sk-1"]), Arc::clone(&aggregator), Arc::clone(&openai));

    let outcome = gateway
        .complete(&user_messages(), "openai/gpt-4o:byok", Some("sk-user-key"))
        .await;

    assert!(outcome.is_success());
    assert_eq!(openai.calls(), 1);
    assert_eq!(openai.credentials_seen(), vec!["sk-user-key"]);
    assert_eq!(aggregator.calls(), 0);
}

#[tokio::test]
async fn test_byok_missing_key_is_terminal() {
    let openai = ScriptedProvider::always_ok();
    let gateway =
        gateway_with(pool_of(&["sk-1"]), ScriptedProvider::always_ok(), Arc::clone(&openai));

    let outcome = gateway.complete(&user_messages(), "openai/gpt-4o:byok", None).await;
    assert_eq!(outcome, CompletionOutcome::failure("No OpenAI API key set."));

    let blank = gateway.complete(&user_messages(), "openai/gpt-4o:byok", Some("   ")).await;
    assert_eq!(blank, CompletionOutcome::failure("No OpenAI API key set."));

    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn test_byok_failures_are_not_retried() {
    let openai = ScriptedProvider::new(vec![http_err(500, "vendor outage")]);
    let gateway =
        gateway_with(pool_of(&["sk-1"]), ScriptedProvider::always_ok(), Arc::clone(&openai));

    let outcome = gateway
        .complete(&user_messages(), "openai/gpt-4o:byok", Some("sk-user-key"))
        .await;

    // A rate-limit-shaped error still means exactly one attempt for BYOK
    assert_eq!(openai.calls(), 1);
    assert!(matches!(outcome, CompletionOutcome::Failure { .. }));
}

#[tokio::test]
async fn test_streaming_rejected_for_byok_models() {
    let gateway = gateway_with(
        pool_of(&["sk-1"]),
        ScriptedProvider::always_ok(),
        ScriptedProvider::always_ok(),
    );

    let result = gateway
        .complete_stream(&user_messages(), "anthropic/claude-4-sonnet:byok")
        .await;

    match result {
        Err(AppError::Unsupported(message)) => {
            assert_eq!(message, "Streaming is only supported for free models in this version.");
        }
        other => panic!("expected unsupported error, got {:?}", other.map(|_| "stream")),
    }
}

#[tokio::test]
async fn test_streaming_rejected_for_unroutable_models() {
    let gateway = gateway_with(
        pool_of(&["sk-1"]),
        ScriptedProvider::always_ok(),
        ScriptedProvider::always_ok(),
    );

    let result = gateway.complete_stream(&user_messages(), "mistral-small").await;
    assert!(matches!(result, Err(AppError::UnroutableModel)));
}

#[tokio::test]
async fn test_streaming_retries_before_first_token() {
    let aggregator = ScriptedProvider::with_stream_script(vec![
        Err(ProviderError::Http { status: 429, body: "rate limit".to_string() }),
        Ok(vec!["Hel", "lo"]),
    ]);
    let gateway = gateway_with(
        pool_of(&["sk-1", "sk-2"]),
        Arc::clone(&aggregator),
        ScriptedProvider::always_ok(),
    );

    let stream = gateway
        .complete_stream(&user_messages(), "google/gemini-2.0-flash-exp:free")
        .await
        .expect("stream should open after rotation");

    let tokens: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
    assert_eq!(tokens, vec!["Hel", "lo"]);
    assert_eq!(aggregator.calls(), 2);
    assert_eq!(aggregator.credentials_seen(), vec!["sk-1", "sk-2"]);
}
