use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use crate::cache::token::CachedToken;
use crate::helpers::time::{Clock, SystemClock};

/// Shared bearer token cache with a staleness window.
///
/// Cloning is cheap and every clone sees the same token. Refreshes are
/// serialized through `refresh_guard` so concurrent stale callers coalesce.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<RwLock<Option<CachedToken>>>,
    refresh_guard: Arc<Mutex<()>>,
    clock: Arc<dyn Clock>,
    stale_window: Duration,
}

impl TokenCache {
    pub fn new(stale_window: Duration) -> Self {
        Self::with_clock(stale_window, Arc::new(SystemClock))
    }

    pub fn with_clock(stale_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            refresh_guard: Arc::new(Mutex::new(())),
            clock,
            stale_window,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn stale_window(&self) -> Duration {
        self.stale_window
    }

    /// Cached token if it is still inside the staleness window
    pub async fn get_fresh(&self) -> Option<CachedToken> {
        let now = self.now();
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(now, self.stale_window))
            .cloned()
    }

    /// Cached token regardless of age
    pub async fn snapshot(&self) -> Option<CachedToken> {
        self.inner.read().await.clone()
    }

    /// Store a new token stamped with the current time
    pub async fn set(&self, value: String) -> CachedToken {
        let token = CachedToken::new(value, self.now());
        *self.inner.write().await = Some(token.clone());
        debug!(fetched_at = %token.fetched_at, "token cached");
        token
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
        debug!("token cache cleared");
    }

    /// Held for the whole duration of a refresh
    pub async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_guard.lock().await
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("stale_window", &self.stale_window)
            .finish_non_exhaustive()
    }
}
