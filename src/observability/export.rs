use anyhow::Result;
use prometheus::{Encoder, TextEncoder};

use crate::observability::metrics::get_metrics;

/// Prometheus text exposition of every registered metric
pub async fn render_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = get_metrics().await.registry.gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
