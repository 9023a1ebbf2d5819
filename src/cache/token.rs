use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::helpers::time::age;

/// Bearer token together with the moment it was obtained.
///
/// Value and timestamp live in one struct, so a cache holding
/// `Option<CachedToken>` can never have one without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub value: String,
    pub fetched_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(value: String, fetched_at: DateTime<Utc>) -> Self {
        Self { value, fetched_at }
    }

    /// Fresh while `now - fetched_at <= stale_window`
    pub fn is_fresh(&self, now: DateTime<Utc>, stale_window: Duration) -> bool {
        age(now, self.fetched_at) <= stale_window
    }
}
