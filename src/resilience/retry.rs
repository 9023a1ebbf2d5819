use tokio::time::{sleep, Duration};
use anyhow::Result;
use tracing::{error, warn};

use crate::config::settings::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetrySettings {
    /// Same delay between every attempt
    pub fn fixed(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, base_delay_ms: delay_ms, max_delay_ms: delay_ms }
    }

    /// Config values win, missing ones fall back to a fixed policy
    pub fn from_config(retry: Option<&RetryConfig>, attempts: u32, delay_ms: u64) -> Self {
        let base_delay_ms = retry.and_then(|r| r.base_delay_ms).unwrap_or(delay_ms);
        Self {
            attempts: retry.and_then(|r| r.attempts).unwrap_or(attempts).max(1),
            base_delay_ms,
            max_delay_ms: retry.and_then(|r| r.max_delay_ms).unwrap_or(base_delay_ms).max(base_delay_ms),
        }
    }

    pub async fn run_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = delay.saturating_mul(2).min(self.max_delay_ms);
                    attempt += 1;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}
