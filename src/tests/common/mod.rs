// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;

use crate::cache::token_cache::TokenCache;
use crate::client::executor::AuthenticatedClient;
use crate::config::service::ApiConfig;
use crate::helpers::time::ManualClock;
use crate::session::token_session::TokenSession;
use crate::sources::fetch::{TokenOptions, TokenProvider};
use crate::version::source::VersionSource;

pub const STALE_WINDOW: Duration = Duration::from_secs(240);

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Identity provider double issuing `token-1`, `token-2`, ...
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
    /// scripted answers consumed before falling back to counting tokens
    script: Arc<Mutex<VecDeque<Result<Option<String>, String>>>>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then_answer(self, answer: Result<Option<String>, String>) -> Self {
        self.script.lock().unwrap().push_back(answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenProvider for CountingProvider {
    async fn get_token(&self, _options: &TokenOptions) -> Result<Option<String>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(Some(format!("token-{}", n))),
        }
    }
}

/// Version source double with per-operation scripted answers and call counters
#[derive(Clone, Default)]
pub struct FakeVersionSource {
    pub latest_calls: Arc<AtomicUsize>,
    pub store_calls: Arc<AtomicUsize>,
    latest: Option<String>,
    store_url: Option<String>,
    store_fails: bool,
}

impl FakeVersionSource {
    pub fn latest(version: &str) -> Self {
        Self { latest: Some(version.to_owned()), ..Self::default() }
    }

    /// latest version lookup always fails
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_store_url(mut self, url: &str) -> Self {
        self.store_url = Some(url.to_owned());
        self
    }

    pub fn with_failing_store_url(mut self) -> Self {
        self.store_fails = true;
        self
    }
}

impl VersionSource for FakeVersionSource {
    async fn latest_version(&self, package_id: &str) -> Result<String> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.latest
            .clone()
            .ok_or_else(|| anyhow!("store lookup for '{}' timed out", package_id))
    }

    async fn store_url(&self, _package_id: &str) -> Result<Option<String>> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.store_fails {
            return Err(anyhow!("store url lookup failed"));
        }
        Ok(self.store_url.clone())
    }
}

pub fn api_config(addr: SocketAddr) -> ApiConfig {
    ApiConfig { base_url: format!("http://{}/api", addr), timeout_ms: Some(5000), headers: None }
}

/// Client over a fresh cache driven by `clock`
pub fn build_client(
    addr: SocketAddr,
    provider: CountingProvider,
    clock: &ManualClock,
) -> AuthenticatedClient<CountingProvider> {
    let cache = TokenCache::with_clock(STALE_WINDOW, Arc::new(clock.clone()));
    let session = TokenSession::new(provider, TokenOptions::new("backend"), cache);
    AuthenticatedClient::new(build_reqwest_client(), &api_config(addr), Arc::new(session))
        .expect("client")
}
