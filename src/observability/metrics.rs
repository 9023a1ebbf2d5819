use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_refreshes: IntCounterVec,
    pub token_refresh_failures: IntCounterVec,
    pub token_refresh_duration: HistogramVec,

    // Request metrics
    pub api_requests: IntCounterVec,
    pub api_auth_retries: IntCounter,
    pub api_request_duration: HistogramVec,

    // Version gate metrics
    pub version_checks: IntCounterVec,
    pub version_lookup_failures: IntCounterVec,

    // Config
    pub config_parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("authgate".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_refreshes: IntCounterVec::new(Opts::new("token_refreshes_total", "Token refreshes by reason"),&["reason"],).unwrap(),
            token_refresh_failures: IntCounterVec::new(Opts::new("token_refresh_failures_total", "Token refresh failures by reason"),&["reason"],).unwrap(),
            token_refresh_duration: HistogramVec::new(HistogramOpts::new("token_refresh_duration_seconds", "Identity provider call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["reason"],).unwrap(),

            // Requests
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Backend requests by method and status class"),&["method", "status"],).unwrap(),
            api_auth_retries: IntCounter::new("api_auth_retries_total", "Requests retried after a 401").unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "Backend request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),&["method"],).unwrap(),

            // Version gate
            version_checks: IntCounterVec::new(Opts::new("version_checks_total", "Update checks by outcome"),&["outcome"],).unwrap(),
            version_lookup_failures: IntCounterVec::new(Opts::new("version_lookup_failures_total", "Failed version lookups by operation"),&["operation"],).unwrap(),

            // Config
            config_parse_failures: IntCounter::new("config_parse_failures_total","Config files that failed to parse",).unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_duration.clone())).unwrap();
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_auth_retries.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.version_checks.clone())).unwrap();
        reg.register(Box::new(metrics.version_lookup_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }
}

/// Status label: "2xx", "4xx", ...
pub fn status_class(status: http::StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
