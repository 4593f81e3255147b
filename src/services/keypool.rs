//! Credential pool manager
//!
//! Rotation state over the configured aggregator credentials with daily
//! rate-limit tracking. A credential marked rate-limited stays unusable
//! until the UTC date rolls over; stale records are purged lazily on the
//! next read rather than by a background job.

use crate::utils::error::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, error, warn};

/// A pooled credential, identified by its slot position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Position in the configured ordered list
    pub index: usize,
    /// The secret value
    pub secret: String,
}

/// Source of "today" for rate-limit records; injectable so tests can
/// simulate date rollover
type TodaySource = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Rotation state shared across concurrent completions
struct PoolState {
    /// Current rotation index
    current: usize,
    /// Credential index -> date it was marked exhausted
    rate_limited: HashMap<usize, NaiveDate>,
}

/// Credential pool manager for the free-tier aggregator
pub struct CredentialPool {
    keys: Vec<String>,
    state: Mutex<PoolState>,
    today: TodaySource,
}

impl CredentialPool {
    /// Create a pool over the configured credentials, in configuration
    /// order. Blank entries are filtered out.
    pub fn new(keys: Vec<String>) -> Self {
        Self::with_today_source(keys, || Utc::now().date_naive())
    }

    /// Create a pool with an injected "today" source
    pub fn with_today_source<F>(keys: Vec<String>, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        Self {
            keys,
            state: Mutex::new(PoolState { current: 0, rate_limited: HashMap::new() }),
            today: Box::new(today),
        }
    }

    /// All configured credentials in fixed order
    pub fn available_credentials(&self) -> Vec<Credential> {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, secret)| Credential { index, secret: secret.clone() })
            .collect()
    }

    /// Number of configured credentials
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no credentials are configured
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Get the credential at the current rotation index
    ///
    /// Purges stale rate-limit records first. If the current index is
    /// rate-limited today, advances to the first usable index; if every
    /// index is rate-limited, the current credential is returned anyway
    /// and the condition is logged (the caller's request will fail and
    /// flow through the normal retry loop).
    pub fn current_credential(&self) -> AppResult<Credential> {
        if self.keys.is_empty() {
            return Err(AppError::NoCredentials);
        }

        let today = (self.today)();
        let mut state = self.state.lock().map_err(|_| poisoned())?;

        purge_stale(&mut state.rate_limited, today);

        // Keep the index within bounds in case the pool shrank between runs
        if state.current >= self.keys.len() {
            state.current = 0;
        }

        if state.rate_limited.contains_key(&state.current) {
            match self.first_usable_index(&state.rate_limited) {
                Some(next) => {
                    debug!("Credential #{} is rate limited, advancing to #{}", state.current + 1, next + 1);
                    state.current = next;
                }
                None => {
                    error!("All API keys are rate limited");
                }
            }
        }

        Ok(self.credential_at(state.current))
    }

    /// Mark the current credential as rate-limited for today and advance
    /// to the next usable one
    ///
    /// With a single-credential pool this is a no-op: rotation is
    /// meaningless, and marking the only key would just lock the pool
    /// out until tomorrow.
    pub fn cycle_to_next(&self) -> AppResult<Credential> {
        if self.keys.is_empty() {
            return Err(AppError::NoCredentials);
        }

        if self.keys.len() == 1 {
            return Ok(self.credential_at(0));
        }

        let today = (self.today)();
        let mut state = self.state.lock().map_err(|_| poisoned())?;

        let marked = state.current;
        state.rate_limited.insert(marked, today);
        warn!("API key #{} marked as rate limited until tomorrow", marked + 1);

        purge_stale(&mut state.rate_limited, today);

        // Scan forward circularly from current + 1 for the first usable index
        for offset in 1..=self.keys.len() {
            let candidate = (marked + offset) % self.keys.len();
            if !state.rate_limited.contains_key(&candidate) {
                debug!("Cycling to API key #{}", candidate + 1);
                state.current = candidate;
                return Ok(self.credential_at(candidate));
            }
        }

        // Everything is rate limited: advance by exactly one position so
        // rotation stays deterministic and the caller fails naturally
        error!("All API keys are rate limited");
        state.current = (marked + 1) % self.keys.len();
        Ok(self.credential_at(state.current))
    }

    /// First non-rate-limited index in configuration order
    fn first_usable_index(&self, rate_limited: &HashMap<usize, NaiveDate>) -> Option<usize> {
        (0..self.keys.len()).find(|index| !rate_limited.contains_key(index))
    }

    fn credential_at(&self, index: usize) -> Credential {
        Credential { index, secret: self.keys[index].clone() }
    }
}

/// Drop any record not dated today
fn purge_stale(rate_limited: &mut HashMap<usize, NaiveDate>, today: NaiveDate) {
    rate_limited.retain(|_, date| *date == today);
}

fn poisoned() -> AppError {
    AppError::Internal("credential pool lock poisoned".to_string())
}
