use std::collections::HashMap;

use anyhow::{anyhow, Result};
use http::Method;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::service::IdentityConfig;
use crate::parser::parser::extract_value;
use crate::parser::template::render_template;
use crate::sources::fetch::{prepare_generic_value, TokenOptions, TokenProvider};
use crate::utils::constants::TEMPLATE_PLACEHOLDER;

/// Identity provider reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    pub cfg: IdentityConfig,
    pub client: Client,
}

impl HttpTokenProvider {
    pub fn new(cfg: IdentityConfig, client: Client) -> Self {
        Self { cfg, client }
    }
}

impl TokenProvider for HttpTokenProvider {
    async fn get_token(&self, options: &TokenOptions) -> Result<Option<String>> {
        let ctx = HashMap::from([(TEMPLATE_PLACEHOLDER, options.template.as_str())]);
        let url = render_template(&self.cfg.url, &ctx)?;

        let mut request = self.client.request(self.cfg.method.clone(), &url);

        // Build headers dynamically
        if let Some(headers) = &self.cfg.headers {
            for (key, v) in headers {
                let value = prepare_generic_value(v).await?;
                request = request.header(key, value);
            }
        }
        if self.cfg.method == Method::POST {
            request = request.json(&json!({ "template": options.template }));
        }

        debug!(url = %url, template = %options.template, "requesting token");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("identity provider responded {}: {}", status, body));
        }
        extract_value(&body, self.cfg.token_pointer())
    }
}
