use tracing::{debug, error, info, warn};

use crate::cache::token::CachedToken;
use crate::cache::token_cache::TokenCache;
use crate::error::FetchError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::session::mirror::FileTokenMirror;
use crate::sources::fetch::{TokenOptions, TokenProvider};

/// Why the identity provider is being asked for a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// nothing cached yet
    Initial,
    /// cached token is past the staleness window
    Stale,
    /// backend rejected the cached token with 401
    Unauthorized,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshReason::Initial => "initial",
            RefreshReason::Stale => "stale",
            RefreshReason::Unauthorized => "unauthorized",
        }
    }
}

/// Keeps the shared token cache filled from a `TokenProvider`.
///
/// Refreshes are single-flight: whoever wins the refresh lock calls the
/// provider, everybody queued behind it re-checks the cache and reuses the
/// new token.
pub struct TokenSession<P> {
    provider: P,
    options: TokenOptions,
    cache: TokenCache,
    mirror: Option<FileTokenMirror>,
}

impl<P: TokenProvider> TokenSession<P> {
    pub fn new(provider: P, options: TokenOptions, cache: TokenCache) -> Self {
        Self { provider, options, cache, mirror: None }
    }

    pub fn with_mirror(mut self, mirror: FileTokenMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn options(&self) -> &TokenOptions {
        &self.options
    }

    /// Cached token while fresh, otherwise a new one from the provider.
    pub async fn ensure_fresh_token(&self) -> Result<String, FetchError> {
        if let Some(token) = self.cache.get_fresh().await {
            return Ok(token.value);
        }

        let _guard = self.cache.lock_refresh().await;
        // another caller may have refreshed while we waited
        if let Some(token) = self.cache.get_fresh().await {
            debug!("reusing token refreshed by a concurrent caller");
            return Ok(token.value);
        }

        let reason = match self.cache.snapshot().await {
            Some(_) => RefreshReason::Stale,
            None => RefreshReason::Initial,
        };
        self.refresh_locked(reason).await.map(|token| token.value)
    }

    /// Replace `rejected` with a new token, ignoring the staleness window.
    ///
    /// If the cache already holds a different fresh token, a concurrent caller
    /// refreshed first and that token is returned instead.
    pub async fn force_refresh(&self, rejected: &str) -> Result<String, FetchError> {
        let _guard = self.cache.lock_refresh().await;
        if let Some(token) = self.cache.get_fresh().await {
            if token.value != rejected {
                debug!("rejected token already replaced by a concurrent caller");
                return Ok(token.value);
            }
        }
        self.refresh_locked(RefreshReason::Unauthorized).await.map(|token| token.value)
    }

    /// Forget the token in memory and on disk.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        let _guard = self.cache.lock_refresh().await;
        self.cache.clear().await;
        if let Some(mirror) = &self.mirror {
            mirror.clear().await?;
        }
        info!("signed out, token cache cleared");
        Ok(())
    }

    /// Caller must hold the refresh lock.
    async fn refresh_locked(&self, reason: RefreshReason) -> Result<CachedToken, FetchError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_refreshes.with_label_values(&[reason.as_str()]).inc();
        info!(reason = reason.as_str(), template = %self.options.template, "refreshing token");

        let result = self.provider.get_token(&self.options).await;
        metrics
            .token_refresh_duration
            .with_label_values(&[reason.as_str()])
            .observe(start.elapsed().as_secs_f64());

        let value = match result {
            Ok(Some(value)) => value,
            Ok(None) => {
                metrics.token_refresh_failures.with_label_values(&[reason.as_str()]).inc();
                error!(reason = reason.as_str(), "identity provider issued no token");
                return Err(FetchError::AuthToken("identity provider issued no token".to_owned()));
            }
            Err(e) => {
                metrics.token_refresh_failures.with_label_values(&[reason.as_str()]).inc();
                error!(reason = reason.as_str(), error = %e, "token refresh failed");
                return Err(FetchError::AuthToken(format!("{:#}", e)));
            }
        };

        let token = self.cache.set(value).await;
        if let Some(mirror) = &self.mirror {
            // mirror is best effort, the in-memory cache is authoritative
            let _ = mirror
                .store(&token)
                .await
                .inspect_err(|e| warn!(path = %mirror.path().display(), error = %e, "token mirror write failed"));
        }
        Ok(token)
    }
}

impl<P> std::fmt::Debug for TokenSession<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSession")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}
