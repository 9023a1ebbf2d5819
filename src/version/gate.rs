//! Update gate: decides at start-up whether the installed version may be used.
//!
//! `Checking` → `Required` | `NotRequired` | `Error`. `Error` fails open, so
//! a broken version lookup never locks the user out.

use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::service::VersionCheckConfig;
use crate::error::VersionCheckError;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{DEFAULT_VERSION_LOOKUP_ATTEMPTS, DEFAULT_VERSION_LOOKUP_DELAY_MS};
use crate::version::semver::{is_critically_outdated, Version};
use crate::version::source::VersionSource;

static LATEST_VERSION_OP: &str = "latest_version";
static STORE_URL_OP: &str = "store_url";

/// Which gap between installed and latest version blocks the app
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// any newer published version
    #[default]
    AnyNewer,
    /// any major bump, or two or more minor / patch versions behind
    CriticallyOutdated,
}

impl GatePolicy {
    pub fn requires_update(&self, latest: &Version, current: &Version) -> bool {
        match self {
            GatePolicy::AnyNewer => latest > current,
            GatePolicy::CriticallyOutdated => is_critically_outdated(latest, current),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Required,
    NotRequired,
    Error,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Checking => "checking",
            GateState::Required => "required",
            GateState::NotRequired => "not_required",
            GateState::Error => "error",
        }
    }
}

/// Outcome of one update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    Required { current: Version, latest: Version, store_url: Option<String> },
    NotRequired { current: Version, latest: Version },
    Error(VersionCheckError),
}

impl UpdateCheck {
    pub fn state(&self) -> GateState {
        match self {
            UpdateCheck::Required { .. } => GateState::Required,
            UpdateCheck::NotRequired { .. } => GateState::NotRequired,
            UpdateCheck::Error(_) => GateState::Error,
        }
    }

    /// Only `Required` blocks; `Error` is treated as "proceed".
    pub fn blocks_usage(&self) -> bool {
        match self {
            UpdateCheck::Required { .. } => true,
            UpdateCheck::NotRequired { .. } => false,
            UpdateCheck::Error(_) => false,
        }
    }
}

pub struct UpdateGate<S> {
    source: S,
    package_id: String,
    policy: GatePolicy,
    retry: RetrySettings,
    state: watch::Sender<GateState>,
}

impl<S: VersionSource> UpdateGate<S> {
    pub fn new(source: S, package_id: impl Into<String>, policy: GatePolicy, retry: RetrySettings) -> Self {
        let (state, _) = watch::channel(GateState::Checking);
        Self { source, package_id: package_id.into(), policy, retry, state }
    }

    pub fn from_config(source: S, cfg: &VersionCheckConfig) -> Self {
        let retry = RetrySettings::from_config(
            cfg.retry.as_ref(),
            DEFAULT_VERSION_LOOKUP_ATTEMPTS,
            DEFAULT_VERSION_LOOKUP_DELAY_MS,
        );
        Self::new(source, cfg.package_id.clone(), cfg.policy, retry)
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Observe state transitions, e.g. to swap a splash screen for a blocking one
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    pub async fn check(&self, current: &str) -> UpdateCheck {
        self.state.send_replace(GateState::Checking);
        let result = self.evaluate(current).await;
        let state = result.state();

        match &result {
            UpdateCheck::Required { current, latest, store_url } => {
                info!(%current, %latest, store_url = ?store_url, policy = ?self.policy, "update required");
            }
            UpdateCheck::NotRequired { current, latest } => {
                info!(%current, %latest, "update not required");
            }
            UpdateCheck::Error(e) => {
                warn!(error = %e, "update check failed, proceeding without update");
            }
        }
        get_metrics().await.version_checks.with_label_values(&[state.as_str()]).inc();
        self.state.send_replace(state);
        result
    }

    async fn evaluate(&self, current: &str) -> UpdateCheck {
        let current = match Version::from_str(current) {
            Ok(v) => v,
            Err(e) => return UpdateCheck::Error(e),
        };

        let latest = match self.lookup_latest().await {
            Ok(v) => v,
            Err(e) => return UpdateCheck::Error(e),
        };

        if !self.policy.requires_update(&latest, &current) {
            return UpdateCheck::NotRequired { current, latest };
        }

        // missing store url is logged, the update is still required
        let store_url = match self.lookup_store_url().await {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "store url lookup failed");
                None
            }
        };
        UpdateCheck::Required { current, latest, store_url }
    }

    async fn lookup_latest(&self) -> Result<Version, VersionCheckError> {
        let raw = match self.retry.run_with_retry(|| self.source.latest_version(&self.package_id)).await {
            Ok(raw) => raw,
            Err(e) => {
                get_metrics().await.version_lookup_failures.with_label_values(&[LATEST_VERSION_OP]).inc();
                return Err(VersionCheckError::LatestVersion(format!("{:#}", e)));
            }
        };
        Version::from_str(&raw)
    }

    async fn lookup_store_url(&self) -> Result<Option<String>, VersionCheckError> {
        match self.retry.run_with_retry(|| self.source.store_url(&self.package_id)).await {
            Ok(url) => Ok(url),
            Err(e) => {
                get_metrics().await.version_lookup_failures.with_label_values(&[STORE_URL_OP]).inc();
                Err(VersionCheckError::StoreUrl(format!("{:#}", e)))
            }
        }
    }
}
