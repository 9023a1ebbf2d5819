//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Covers url/pointer/template rules, header names, retry invariants,
//!   logging level, absolute paths and version strings

use http::{header::AUTHORIZATION, HeaderName, Method};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

use crate::config::service::{
    ApiConfig, GenericValue, IdentityConfig, LookupConfig, ServiceConfig, SessionConfig,
    VersionCheckConfig,
};
use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{PACKAGE_ID_PLACEHOLDER, TEMPLATE_PLACEHOLDER};
use crate::version::semver::Version;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_identity(&cfg.identity, &mut errors);
    validate_api(&cfg.api, &mut errors);
    if let Some(version_check) = &cfg.version_check {
        validate_version_check(version_check, &mut errors);
    }
    validate_session(&cfg.session, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// IDENTITY PROVIDER
fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    validate_url("identity.url", &identity.url, errors);
    validate_placeholders("identity.url", &identity.url, &[TEMPLATE_PLACEHOLDER], errors);

    if identity.template.trim().is_empty() {
        errors.push("identity.template cannot be empty".to_string());
    }

    if identity.method != Method::GET && identity.method != Method::POST {
        errors.push(format!(
            "identity.method '{}' must be 'GET' or 'POST'",
            identity.method
        ));
    }

    if let Some(pointer) = &identity.token_pointer {
        validate_pointer("identity.token_pointer", pointer, errors);
    }

    if identity.stale_window_seconds == Some(0) {
        errors.push("identity.stale_window_seconds must be > 0".to_string());
    }

    if let Some(headers) = &identity.headers {
        for (name, value) in headers {
            let path = format!("identity.headers.{}", name);
            validate_header_name(&path, name, errors);
            validate_generic_value(&path, value, errors);
        }
    }
}

/// BACKEND
fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    validate_url("api.base_url", &api.base_url, errors);

    if api.timeout_ms == Some(0) {
        errors.push("api.timeout_ms must be > 0".to_string());
    }

    if let Some(headers) = &api.headers {
        for name in headers.keys() {
            let path = format!("api.headers.{}", name);
            validate_header_name(&path, name, errors);
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                errors.push(format!(
                    "{}: authorization header is managed by the token cache",
                    path
                ));
            }
        }
    }
}

/// VERSION CHECK
fn validate_version_check(version_check: &VersionCheckConfig, errors: &mut Vec<String>) {
    if version_check.package_id.trim().is_empty() {
        errors.push("version_check.package_id cannot be empty".to_string());
    }

    if let Some(current) = &version_check.current_version {
        if let Err(err) = Version::from_str(current) {
            errors.push(format!("version_check.current_version: {}", err));
        }
    }

    validate_lookup("version_check.latest_version", &version_check.latest_version, errors);
    if let Some(store_url) = &version_check.store_url {
        validate_lookup("version_check.store_url", store_url, errors);
    }

    if let Some(retry) = &version_check.retry {
        validate_retry("version_check.retry", retry, errors);
    }
}

fn validate_lookup(path: &str, lookup: &LookupConfig, errors: &mut Vec<String>) {
    let url_path = format!("{}.url", path);
    validate_url(&url_path, &lookup.url, errors);
    validate_placeholders(&url_path, &lookup.url, &[PACKAGE_ID_PLACEHOLDER], errors);
    if let Some(pointer) = &lookup.pointer {
        validate_pointer(&format!("{}.pointer", path), pointer, errors);
    }
}

/// SESSION
fn validate_session(session: &SessionConfig, errors: &mut Vec<String>) {
    if let Some(path) = &session.mirror_path {
        if !Path::new(path).is_absolute() {
            errors.push(format!(
                "session.mirror_path '{}' must be an absolute path, relative paths are not allowed",
                path
            ));
        }
    }
}

fn validate_url(path: &str, url: &str, errors: &mut Vec<String>) {
    let url = url.trim();
    if url.is_empty() {
        errors.push(format!("{} cannot be empty", path));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{} '{}' must start with http:// or https://", path, url));
    }
}

fn validate_pointer(path: &str, pointer: &str, errors: &mut Vec<String>) {
    // empty pointer selects the whole (plain text) body
    if !pointer.is_empty() && !pointer.starts_with('/') {
        errors.push(format!(
            "{} '{}' must be empty or a JSON pointer starting with '/'",
            path, pointer
        ));
    }
}

fn validate_header_name(path: &str, name: &str, errors: &mut Vec<String>) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(format!("{}: '{}' is not a valid header name", path, name));
    }
}

fn validate_generic_value(path: &str, value: &GenericValue, errors: &mut Vec<String>) {
    match value {
        GenericValue::Literal { value, .. } => {
            if value.is_empty() {
                errors.push(format!("{}: literal value cannot be empty", path));
            }
        }
        GenericValue::FromEnv { from_env, .. } => {
            if from_env.trim().is_empty() {
                errors.push(format!("{}: from_env cannot be empty", path));
            }
        }
        GenericValue::FromFile { path: file, .. } => {
            if !Path::new(file).is_absolute() {
                errors.push(format!(
                    "{}: file path '{}' must be absolute, relative paths are not allowed",
                    path, file
                ));
            }
        }
    }
}

/// Check `{{name}}` placeholders against the allowed set
fn validate_placeholders(path: &str, template: &str, allowed: &[&str], errors: &mut Vec<String>) {
    let re = match Regex::new(r"\{\{\s*([^}]*?)\s*\}\}") {
        Ok(re) => re,
        Err(_) => return,
    };
    let mut seen: HashSet<&str> = HashSet::new();
    for caps in re.captures_iter(template) {
        if let Some(name) = caps.get(1).map(|m| m.as_str()) {
            if !allowed.contains(&name) && seen.insert(name) {
                errors.push(format!(
                    "{}: unknown placeholder '{{{{{}}}}}', allowed: {:?}",
                    path, name, allowed
                ));
            }
        }
    }
}
