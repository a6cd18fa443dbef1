//! Request quota.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Snapshot of the core request quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed per window
    pub limit: u64,
    /// Requests left in the current window
    pub remaining: u64,
    /// When the window resets
    pub reset: DateTime<Utc>,
}

/// One bucket of the `/rate_limit` response.
#[derive(Debug, Deserialize)]
pub(crate) struct RateBucket {
    limit: u64,
    remaining: u64,
    reset: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    resources: Resources,
}

#[derive(Debug, Deserialize)]
struct Resources {
    core: RateBucket,
}

impl From<RateLimitResponse> for RateLimit {
    fn from(response: RateLimitResponse) -> Self {
        let core = response.resources.core;
        Self {
            limit: core.limit,
            remaining: core.remaining,
            reset: Utc
                .timestamp_opt(core.reset, 0)
                .single()
                .unwrap_or_default(),
        }
    }
}
