use std::collections::HashMap;

use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::service::LookupConfig;
use crate::parser::parser::extract_value;
use crate::parser::template::render_template;
use crate::utils::constants::PACKAGE_ID_PLACEHOLDER;

/// Where the latest published version and the store page come from
pub trait VersionSource: Send + Sync {
    fn latest_version(
        &self,
        package_id: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// `Ok(None)` when no store url is published
    fn store_url(
        &self,
        package_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}

/// Version lookups over plain GET + JSON pointer
#[derive(Debug, Clone)]
pub struct HttpVersionSource {
    client: Client,
    latest_version: LookupConfig,
    store_url: Option<LookupConfig>,
}

impl HttpVersionSource {
    pub fn new(client: Client, latest_version: LookupConfig, store_url: Option<LookupConfig>) -> Self {
        Self { client, latest_version, store_url }
    }

    async fn lookup(&self, lookup: &LookupConfig, pointer: &str, package_id: &str) -> Result<Option<String>> {
        let ctx = HashMap::from([(PACKAGE_ID_PLACEHOLDER, package_id)]);
        let url = render_template(&lookup.url, &ctx)?;

        debug!(url = %url, "version lookup");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("'{}' responded {}: {}", url, status, body));
        }
        extract_value(&body, pointer)
    }
}

impl VersionSource for HttpVersionSource {
    async fn latest_version(&self, package_id: &str) -> Result<String> {
        self.lookup(&self.latest_version, self.latest_version.latest_version_pointer(), package_id)
            .await?
            .ok_or_else(|| anyhow!("no latest version published for '{}'", package_id))
    }

    async fn store_url(&self, package_id: &str) -> Result<Option<String>> {
        match &self.store_url {
            Some(lookup) => self.lookup(lookup, lookup.store_url_pointer(), package_id).await,
            None => Ok(None),
        }
    }
}
