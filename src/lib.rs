//! # authgate
//!
//! Authenticated request pipeline and update gate for an app client.
//!
//! Modules:
//! - `cache` — shared bearer token cache with a staleness window
//! - `sources` — identity providers that issue tokens
//! - `session` — single-flight token refresh, sign-out, persisted mirror
//! - `client` — backend requests with one refresh-and-retry on 401
//! - `version` — version comparison and the fail-open update gate
//! - `config` — YAML configuration, defaults and validation

pub mod app;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod session;
pub mod sources;
pub mod utils;
pub mod version;

#[cfg(test)]
mod tests;

pub use crate::config::service::ServiceConfig;
pub use crate::error::{FetchError, VersionCheckError};
pub use crate::version::semver::{is_version_critically_outdated, is_version_newer};
