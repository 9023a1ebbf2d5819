// This suite runs the request executor against a local backend that accepts
// only a configured set of bearer tokens, and checks the refresh/retry policy:
//  - one 401 -> one forced refresh, one retry, body returned
//  - 401 twice -> AuthenticationFailed, no third attempt
//  - other non-2xx -> RequestFailed with the raw body, no retry

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Json;
    use chrono::Utc;
    use serde_json::Value;

    use crate::client::request::{ApiRequest, FormPart};
    use crate::error::FetchError;
    use crate::helpers::time::ManualClock;
    use crate::tests::common::{build_client, json, spawn_axum, CountingProvider, Router};

    #[derive(Clone)]
    struct Backend {
        hits: Arc<AtomicUsize>,
        accepted: Arc<Vec<String>>,
    }

    impl Backend {
        fn accepting(tokens: &[&str]) -> Self {
            Self {
                hits: Arc::new(AtomicUsize::new(0)),
                accepted: Arc::new(tokens.iter().map(|t| t.to_string()).collect()),
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        fn authorized(&self, headers: &HeaderMap) -> Option<String> {
            let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
            let token = auth.strip_prefix("Bearer ")?;
            self.accepted.iter().any(|t| t == token).then(|| token.to_owned())
        }
    }

    async fn list_debates(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, String) {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        match backend.authorized(&headers) {
            Some(token) => (StatusCode::OK, json!({"items": [{"id": 1}], "seen_token": token}).to_string()),
            None => (StatusCode::UNAUTHORIZED, "token expired".to_owned()),
        }
    }

    async fn create_debate(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        match backend.authorized(&headers) {
            Some(_) => (StatusCode::CREATED, Json(json!({"created": body}))),
            None => (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))),
        }
    }

    async fn upload(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
        backend.hits.fetch_add(1, Ordering::SeqCst);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        Json(json!({"content_type": content_type}))
    }

    async fn broken() -> (StatusCode, &'static str) {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }

    fn router(backend: Backend) -> Router {
        Router::new()
            .route("/api/debates", get(list_debates).post(create_debate))
            .route("/api/upload", post(upload))
            .route("/api/broken", get(broken))
            .with_state(backend)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_401_refreshes_once_and_retries_once() {
        let backend = Backend::accepting(&["token-2"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new();
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let body = client.execute(&ApiRequest::get("/debates")).await.unwrap();

        assert_eq!(body["seen_token"], "token-2");
        assert_eq!(provider.calls(), 2, "initial fetch + one forced refresh");
        assert_eq!(backend.hits(), 2, "first attempt + one retry");

        // refreshed token is cached for the next caller
        client.execute(&ApiRequest::get("/debates")).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(backend.hits(), 3);

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_401s_share_one_refresh() {
        let backend = Backend::accepting(&["token-2"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new().with_delay(Duration::from_millis(50));
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let request = ApiRequest::get("/debates");
        let (a, b) = tokio::join!(client.execute(&request), client.execute(&request));

        assert_eq!(a.unwrap()["seen_token"], "token-2");
        assert_eq!(b.unwrap()["seen_token"], "token-2");
        assert_eq!(provider.calls(), 2, "initial fetch + a single refresh for both rejected callers");
        assert_eq!(backend.hits(), 4);

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_401_fails_without_looping() {
        let backend = Backend::accepting(&[]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new();
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let err = client.execute(&ApiRequest::get("/debates")).await.unwrap_err();

        assert!(matches!(err, FetchError::AuthenticationFailed { ref url } if url.ends_with("/api/debates")));
        assert!(err.requires_reauthentication());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(backend.hits(), 2);
        assert_eq!(provider.calls(), 2);

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_2xx_surfaces_status_and_body_without_retry() {
        let backend = Backend::accepting(&["token-1"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new();
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let err = client.execute(&ApiRequest::get("/broken")).await.unwrap_err();

        match err {
            FetchError::RequestFailed { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.calls(), 1);

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn json_body_is_sent_as_json() {
        let backend = Backend::accepting(&["token-1"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let client = build_client(addr, CountingProvider::new(), &ManualClock::new(Utc::now()));

        let request = ApiRequest::post("debates").json(json!({"title": "Pineapple on pizza"}));
        let body = client.execute(&request).await.unwrap();

        assert_eq!(body, json!({"created": {"title": "Pineapple on pizza"}}));

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multipart_body_uses_transport_boundary() {
        let backend = Backend::accepting(&["token-1"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let client = build_client(addr, CountingProvider::new(), &ManualClock::new(Utc::now()));

        let request = ApiRequest::post("/upload").multipart(vec![
            FormPart::text("caption", "avatar"),
            FormPart::File {
                name: "file".into(),
                file_name: "a.png".into(),
                mime: Some("image/png".into()),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            },
        ]);
        let body = client.execute(&request).await.unwrap();

        let content_type = body["content_type"].as_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="), "{content_type}");

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn provider_without_token_is_a_hard_failure() {
        let backend = Backend::accepting(&["token-1"]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new().then_answer(Ok(None));
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let err = client.execute(&ApiRequest::get("/debates")).await.unwrap_err();

        assert!(matches!(err, FetchError::AuthToken(_)), "{err:?}");
        assert_eq!(backend.hits(), 0, "no request may go out with a missing token");
        assert!(client.session().cache().snapshot().await.is_none());

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn provider_failure_during_401_refresh_is_surfaced() {
        let backend = Backend::accepting(&[]);
        let (handle, addr) = spawn_axum(router(backend.clone())).await;
        let provider = CountingProvider::new()
            .then_answer(Ok(Some("token-1".into())))
            .then_answer(Err("identity provider unavailable".into()));
        let client = build_client(addr, provider.clone(), &ManualClock::new(Utc::now()));

        let err = client.execute(&ApiRequest::get("/debates")).await.unwrap_err();

        match err {
            FetchError::AuthToken(message) => assert!(message.contains("unavailable"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.hits(), 1);
        assert_eq!(provider.calls(), 2);

        handle.abort();
    }
}
