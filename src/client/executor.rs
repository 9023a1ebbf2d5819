use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::attempt::RequestAttempt;
use crate::client::request::{build_form, ApiRequest, RequestBody};
use crate::config::service::ApiConfig;
use crate::error::FetchError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, status_class};
use crate::parser::parser::parse_json_body;
use crate::session::token_session::TokenSession;
use crate::sources::fetch::TokenProvider;

/// Sends backend requests with the session's bearer token.
///
/// A 401 triggers one forced token refresh and one retry; a second 401 is
/// `FetchError::AuthenticationFailed`.
pub struct AuthenticatedClient<P> {
    http: Client,
    base_url: String,
    default_headers: HeaderMap,
    session: Arc<TokenSession<P>>,
}

impl<P: TokenProvider> AuthenticatedClient<P> {
    pub fn new(http: Client, api: &ApiConfig, session: Arc<TokenSession<P>>) -> Result<Self, FetchError> {
        let mut default_headers = HeaderMap::new();
        if let Some(headers) = &api.headers {
            for (name, value) in headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| FetchError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| FetchError::InvalidRequest(format!("header '{}' value: {}", name, e)))?;
                default_headers.insert(name, value);
            }
        }

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_owned(),
            default_headers,
            session,
        })
    }

    pub fn session(&self) -> &Arc<TokenSession<P>> {
        &self.session
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request` and return the parsed JSON body.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let mut token = self.session.ensure_fresh_token().await?;
        let mut attempt = RequestAttempt::first(self.url_for(&request.path));

        loop {
            let response = self.send(&attempt, request, &token).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                let url = attempt.url.clone();
                match attempt.retry() {
                    Some(retry) => {
                        warn!(url = %url, "unauthorized, refreshing token and retrying once");
                        get_metrics().await.api_auth_retries.inc();
                        token = self.session.force_refresh(&token).await?;
                        attempt = retry;
                        continue;
                    }
                    None => {
                        warn!(url = %url, "still unauthorized after token refresh");
                        return Err(FetchError::AuthenticationFailed { url });
                    }
                }
            }

            let body = response.text().await?;
            if !status.is_success() {
                info!(url = %attempt.url, status = %status, "request failed");
                return Err(FetchError::RequestFailed { status, body });
            }
            return Ok(parse_json_body(&body)?);
        }
    }

    async fn send(&self, attempt: &RequestAttempt, request: &ApiRequest, token: &str) -> Result<Response, FetchError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        let method = request.method.as_str();

        let headers = self.build_headers(request, token)?;
        let mut builder = self
            .http
            .request(request.method.clone(), &attempt.url)
            .headers(headers);
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        debug!(url = %attempt.url, method, attempt = attempt.attempt.number(), "sending request");
        let response = builder.send().await.inspect_err(|_| {
            metrics.api_requests.with_label_values(&[method, "error"]).inc();
        })?;

        metrics
            .api_request_duration
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64());
        metrics
            .api_requests
            .with_label_values(&[method, status_class(response.status())])
            .inc();
        Ok(response)
    }

    /// Defaults, then caller headers, then the bearer token.
    pub fn build_headers(&self, request: &ApiRequest, token: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = self.default_headers.clone();
        for (name, value) in request.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| FetchError::AuthToken("token contains characters not allowed in a header".to_owned()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        match request.body {
            RequestBody::Json(_) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
            }
            // reqwest adds multipart/form-data with its boundary
            RequestBody::Multipart(_) => {
                headers.remove(CONTENT_TYPE);
            }
            RequestBody::Empty => {}
        }
        Ok(headers)
    }
}

impl<P> std::fmt::Debug for AuthenticatedClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
