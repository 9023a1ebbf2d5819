use http::StatusCode;
use thiserror::Error;

/// Failures of the authenticated request pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    /// identity provider failed or issued no token
    #[error("auth token error: {0}")]
    AuthToken(String),
    /// the retried request was rejected with 401 again
    #[error("authentication failed for '{url}': still unauthorized after token refresh")]
    AuthenticationFailed { url: String },
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// The caller should send the user back to sign-in.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, FetchError::AuthenticationFailed { .. } | FetchError::AuthToken(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::RequestFailed { status, .. } => Some(*status),
            FetchError::AuthenticationFailed { .. } => Some(StatusCode::UNAUTHORIZED),
            FetchError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Failures of the remote version lookup. Never blocking for the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionCheckError {
    #[error("latest version lookup failed: {0}")]
    LatestVersion(String),
    #[error("store url lookup failed: {0}")]
    StoreUrl(String),
    #[error("invalid version '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },
}
