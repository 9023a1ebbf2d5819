use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::client::executor::AuthenticatedClient;
use crate::config::service::ServiceConfig;
use crate::session::mirror::FileTokenMirror;
use crate::session::token_session::TokenSession;
use crate::sources::fetch::TokenOptions;
use crate::sources::http::HttpTokenProvider;
use crate::version::gate::UpdateGate;
use crate::version::source::HttpVersionSource;

/// Composition root: owns the token cache and wires every collaborator to it.
pub struct AppState {
    pub cache: TokenCache,
    pub session: Arc<TokenSession<HttpTokenProvider>>,
    pub client: AuthenticatedClient<HttpTokenProvider>,
    pub update_gate: Option<UpdateGate<HttpVersionSource>>,
    pub mirror: Option<FileTokenMirror>,
}

impl AppState {
    pub fn new(service_config: &ServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(service_config.api.timeout())
            .build()?;

        let identity = &service_config.identity;
        let cache = TokenCache::new(identity.stale_window());
        let provider = HttpTokenProvider::new(identity.clone(), http.clone());

        let mirror = service_config
            .session
            .mirror_path
            .as_ref()
            .map(FileTokenMirror::new);

        let mut session = TokenSession::new(provider, TokenOptions::new(identity.template.clone()), cache.clone());
        if let Some(mirror) = &mirror {
            session = session.with_mirror(mirror.clone());
        }
        let session = Arc::new(session);

        let client = AuthenticatedClient::new(http.clone(), &service_config.api, session.clone())?;

        let update_gate = service_config.version_check.as_ref().map(|cfg| {
            let source = HttpVersionSource::new(http.clone(), cfg.latest_version.clone(), cfg.store_url.clone());
            UpdateGate::from_config(source, cfg)
        });

        info!(
            api = %service_config.api.base_url,
            stale_window_secs = identity.stale_window().as_secs(),
            version_check = update_gate.is_some(),
            "app state ready"
        );

        Ok(Self { cache, session, client, update_gate, mirror })
    }
}
