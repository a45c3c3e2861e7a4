// 🔑 Access Token Cache
//
// Remote registries hand out short-lived bearer tokens. One token is
// shared by every query until it gets close to expiry; a rejected token
// is dropped so the next query fetches a fresh one.

use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Refresh this long before the advertised expiry
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Token {
            value: value.into(),
            expires_at,
        }
    }

    /// Still usable at `now` once `margin` is subtracted from the expiry
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Anything able to mint a new token (OAuth endpoint, fixture...)
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<Token, ProviderError>;
}

pub struct TokenCache<S: TokenSource> {
    source: S,
    margin: Duration,
    current: Mutex<Option<Token>>,
}

impl<S: TokenSource> TokenCache<S> {
    pub fn new(source: S) -> Self {
        TokenCache {
            source,
            margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            current: Mutex::new(None),
        }
    }

    /// Builder pattern: custom safety margin
    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub async fn acquire(&self) -> Result<String, ProviderError> {
        self.acquire_at(Utc::now()).await
    }

    /// Cached token if fresh at `now`, otherwise fetch and cache a new one
    ///
    /// The lock is held across the fetch so concurrent callers wait for a
    /// single refresh instead of each hitting the token endpoint.
    pub async fn acquire_at(&self, now: DateTime<Utc>) -> Result<String, ProviderError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.is_fresh_at(now, self.margin) {
                return Ok(token.value.clone());
            }
        }

        let token = self.source.fetch().await?;
        tracing::debug!(expires_at = %token.expires_at, "Fetched new access token");

        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    /// Forget the cached token (after the server rejected it)
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
