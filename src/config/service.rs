use http::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_LATEST_VERSION_POINTER, DEFAULT_STALE_WINDOW_SECS,
    DEFAULT_STORE_URL_POINTER, DEFAULT_TOKEN_POINTER,
};
use crate::version::gate::GatePolicy;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub version_check: Option<VersionCheckConfig>,
    #[serde(default)]
    pub session: SessionConfig,
}

/// ================================
/// Identity provider (token issuance)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// may contain `{{template}}`
    pub url: String,
    #[serde(with = "http_serde::method", default = "default_identity_method")]
    pub method: Method,
    /// template / audience name passed to the provider
    pub template: String,
    pub headers: Option<HashMap<String, GenericValue>>,
    /// JSON pointer to the token in the response body, empty = raw body
    pub token_pointer: Option<String>,
    pub stale_window_seconds: Option<u64>,
}

impl IdentityConfig {
    pub fn token_pointer(&self) -> &str {
        self.token_pointer.as_deref().unwrap_or(DEFAULT_TOKEN_POINTER)
    }

    pub fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_window_seconds.unwrap_or(DEFAULT_STALE_WINDOW_SECS))
    }
}

/// Header value sources
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum GenericValue {
    Literal {
        value: String,
        prefix: Option<String>,
    },
    FromEnv {
        from_env: String,
        prefix: Option<String>,
    },
    FromFile {
        path: String,
        prefix: Option<String>,
    },
}

/// ================================
/// Backend
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: Option<u64>,
    /// sent with every request, caller headers win
    pub headers: Option<HashMap<String, String>>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS))
    }
}

/// ================================
/// Version check
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct VersionCheckConfig {
    pub package_id: String,
    /// installed version, the CLI may override it
    pub current_version: Option<String>,
    pub latest_version: LookupConfig,
    pub store_url: Option<LookupConfig>,
    #[serde(default)]
    pub policy: GatePolicy,
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    /// may contain `{{package_id}}`
    pub url: String,
    pub pointer: Option<String>,
}

impl LookupConfig {
    pub fn pointer_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.pointer.as_deref().unwrap_or(default)
    }

    pub fn latest_version_pointer(&self) -> &str {
        self.pointer_or(DEFAULT_LATEST_VERSION_POINTER)
    }

    pub fn store_url_pointer(&self) -> &str {
        self.pointer_or(DEFAULT_STORE_URL_POINTER)
    }
}

/// ================================
/// Session persistence
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// absolute path of the persisted token mirror, none = no mirror
    pub mirror_path: Option<String>,
}

fn default_identity_method() -> Method {
    Method::POST
}
