//! Shared constants and invariants

/// Cached tokens older than this are refreshed before use.
pub const DEFAULT_STALE_WINDOW_SECS: u64 = 240;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

// Version lookups: 2 attempts, fixed 1s delay
pub const DEFAULT_VERSION_LOOKUP_ATTEMPTS: u32 = 2;
pub const DEFAULT_VERSION_LOOKUP_DELAY_MS: u64 = 1000;

pub const DEFAULT_TOKEN_POINTER: &str = "/jwt";
pub const DEFAULT_LATEST_VERSION_POINTER: &str = "/version";
pub const DEFAULT_STORE_URL_POINTER: &str = "/store_url";

// Template placeholders
pub const TEMPLATE_PLACEHOLDER: &str = "template";
pub const PACKAGE_ID_PLACEHOLDER: &str = "package_id";
