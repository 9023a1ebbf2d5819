#[cfg(test)]
mod tests {

    use std::collections::HashMap;
    use std::io::Write;

    use http::Method;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;
    use serial_test::serial;

    use crate::config::service::{GenericValue, IdentityConfig, LookupConfig};
    use crate::sources::fetch::{TokenOptions, TokenProvider};
    use crate::sources::http::HttpTokenProvider;
    use crate::tests::common::build_reqwest_client;
    use crate::version::source::{HttpVersionSource, VersionSource};

    fn identity(server: &MockServer, headers: HashMap<String, GenericValue>) -> IdentityConfig {
        IdentityConfig {
            url: format!("{}/tokens/{{{{template}}}}", server.base_url()),
            method: Method::POST,
            template: "backend".into(),
            headers: Some(headers),
            token_pointer: None,
            stale_window_seconds: None,
        }
    }

    #[tokio::test]
    #[serial]
    async fn identity_provider_post_with_env_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/tokens/backend")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({ "template": "backend" }));
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "jwt": "eyJ.issued.token", "expires_in": 60 }));
            })
            .await;

        std::env::set_var("AUTHGATE_TEST_SESSION_KEY", "secret");
        let headers = HashMap::from([(
            "authorization".to_owned(),
            GenericValue::FromEnv { from_env: "AUTHGATE_TEST_SESSION_KEY".into(), prefix: Some("Bearer ".into()) },
        )]);
        let provider = HttpTokenProvider::new(identity(&server, headers), build_reqwest_client());

        let token = provider.get_token(&TokenOptions::new("backend")).await.unwrap();
        std::env::remove_var("AUTHGATE_TEST_SESSION_KEY");

        assert_eq!(token.as_deref(), Some("eyJ.issued.token"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn identity_provider_header_from_file() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/tokens/backend").header("x-session", "from-disk");
                then.status(200).body("plain-token\n");
            })
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from-disk").unwrap();
        let headers = HashMap::from([(
            "x-session".to_owned(),
            GenericValue::FromFile { path: file.path().to_string_lossy().into_owned(), prefix: None },
        )]);
        let mut cfg = identity(&server, headers);
        cfg.method = Method::GET;
        cfg.token_pointer = Some(String::new());
        let provider = HttpTokenProvider::new(cfg, build_reqwest_client());

        let token = provider.get_token(&TokenOptions::new("backend")).await.unwrap();

        assert_eq!(token.as_deref(), Some("plain-token"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn identity_provider_null_token_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/tokens/backend");
                then.status(200).json_body(json!({ "jwt": null }));
            })
            .await;

        let provider = HttpTokenProvider::new(identity(&server, HashMap::new()), build_reqwest_client());

        assert_eq!(provider.get_token(&TokenOptions::new("backend")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn identity_provider_error_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/tokens/backend");
                then.status(403).body("session revoked");
            })
            .await;

        let provider = HttpTokenProvider::new(identity(&server, HashMap::new()), build_reqwest_client());
        let err = provider.get_token(&TokenOptions::new("backend")).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("403"), "{message}");
        assert!(message.contains("session revoked"), "{message}");
    }

    fn lookup(server: &MockServer, path: &str, pointer: Option<&str>) -> LookupConfig {
        LookupConfig { url: format!("{}{}", server.base_url(), path), pointer: pointer.map(str::to_owned) }
    }

    #[tokio::test]
    async fn version_source_renders_package_id_and_reads_pointers() {
        let server = MockServer::start_async().await;
        let latest = server
            .mock_async(|when, then| {
                when.method(GET).path("/apps/com.example.debates/version");
                then.status(200).json_body(json!({ "version": "1.4.2" }));
            })
            .await;
        let store = server
            .mock_async(|when, then| {
                when.method(GET).path("/apps/com.example.debates/listing");
                then.status(200).json_body(json!({ "links": { "store": "https://store.example/debates" } }));
            })
            .await;

        let source = HttpVersionSource::new(
            build_reqwest_client(),
            lookup(&server, "/apps/{{package_id}}/version", None),
            Some(lookup(&server, "/apps/{{package_id}}/listing", Some("/links/store"))),
        );

        assert_eq!(source.latest_version("com.example.debates").await.unwrap(), "1.4.2");
        assert_eq!(
            source.store_url("com.example.debates").await.unwrap().as_deref(),
            Some("https://store.example/debates")
        );
        latest.assert_async().await;
        store.assert_async().await;
    }

    #[tokio::test]
    async fn version_source_without_store_lookup() {
        let server = MockServer::start_async().await;
        let source = HttpVersionSource::new(
            build_reqwest_client(),
            lookup(&server, "/apps/{{package_id}}/version", None),
            None,
        );

        assert_eq!(source.store_url("com.example.debates").await.unwrap(), None);
    }

    #[tokio::test]
    async fn version_source_missing_version_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/apps/com.example.debates/version");
                then.status(200).json_body(json!({ "name": "debates" }));
            })
            .await;

        let source = HttpVersionSource::new(
            build_reqwest_client(),
            lookup(&server, "/apps/{{package_id}}/version", None),
            None,
        );

        assert!(source.latest_version("com.example.debates").await.is_err());
    }
}
