//! Token provider seam
//!
//! The request pipeline only needs "give me a bearer token for this template".
//! Anything able to answer that (an HTTP identity provider, a test double)
//! implements `TokenProvider`.

use anyhow::{anyhow, Result};
use std::env;

use crate::config::service::GenericValue;

/// Parameters of a token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOptions {
    /// template / audience name the provider issues the token for
    pub template: String,
}

impl TokenOptions {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }
}

pub trait TokenProvider: Send + Sync {
    /// `Ok(None)` means the provider answered without a token
    fn get_token(
        &self,
        options: &TokenOptions,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}

pub async fn prepare_generic_value(value: &GenericValue) -> Result<String> {
    let (raw, prefix) = match value {
        GenericValue::Literal { value, prefix } => (value.to_owned(), prefix),
        GenericValue::FromEnv { from_env, prefix } => (
            env::var(from_env).map_err(|err| anyhow!("env '{}': {}", from_env, err))?,
            prefix,
        ),
        GenericValue::FromFile { path, prefix } => (
            tokio::fs::read_to_string(path)
                .await
                .map_err(|err| anyhow!("file '{}': {}", path, err))?
                .trim()
                .to_string(),
            prefix,
        ),
    };
    Ok(match prefix {
        Some(prefix) => format!("{}{}", prefix, raw),
        None => raw,
    })
}
