//! Quota-aware fetch scheduling.
//!
//! The analytics API budgets tokens per hour and per day. Polling it on a
//! fixed interval exhausts the hourly budget under heavy concurrent
//! viewing, so the effective refresh interval widens as the remaining
//! budget shrinks, and a hard guard stops all calls before the budget can
//! reach zero.

use crate::quota::QuotaSnapshot;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Guard threshold must be below the degraded threshold")]
    GuardAboveDegraded,

    #[error("TTL values must be nonzero")]
    ZeroTtl,

    #[error("Normal TTL must not exceed the degraded TTL")]
    TtlOrderInverted,
}

/// Outcome of one refresh decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchDecision {
    /// Call the upstream analytics API now.
    Fetch,
    /// Serve the cached snapshot; the reason is surfaced to the viewer as
    /// an informational banner, not an error.
    UseCache { reason: String },
}

fn default_guard_threshold() -> u64 {
    500
}

fn default_degraded_threshold() -> u64 {
    2000
}

fn default_ttl_normal_secs() -> u64 {
    60
}

fn default_ttl_degraded_secs() -> u64 {
    300
}

/// Thresholds and effective TTLs for the tiered fetch decision.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Below this many remaining hourly tokens, no call is made at all.
    #[serde(default = "default_guard_threshold")]
    pub guard_threshold: u64,

    /// Below this many remaining hourly tokens, the degraded TTL applies.
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: u64,

    #[serde(default = "default_ttl_normal_secs")]
    pub ttl_normal_secs: u64,

    #[serde(default = "default_ttl_degraded_secs")]
    pub ttl_degraded_secs: u64,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        QuotaPolicy {
            guard_threshold: default_guard_threshold(),
            degraded_threshold: default_degraded_threshold(),
            ttl_normal_secs: default_ttl_normal_secs(),
            ttl_degraded_secs: default_ttl_degraded_secs(),
        }
    }
}

impl QuotaPolicy {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.guard_threshold >= self.degraded_threshold {
            return Err(ValidationError::GuardAboveDegraded);
        }
        if self.ttl_normal_secs == 0 || self.ttl_degraded_secs == 0 {
            return Err(ValidationError::ZeroTtl);
        }
        if self.ttl_normal_secs > self.ttl_degraded_secs {
            return Err(ValidationError::TtlOrderInverted);
        }
        Ok(())
    }

    /// Whether the remaining hourly budget puts the session in the
    /// degraded tier. Unknown budgets are treated as plentiful.
    pub fn is_degraded(&self, quota: &QuotaSnapshot) -> bool {
        quota
            .tokens_per_hour
            .remaining
            .is_some_and(|remaining| remaining < self.degraded_threshold)
    }

    /// Decides whether a refresh may call the upstream API.
    ///
    /// The first-ever call (no recorded quota or fetch time) always
    /// fetches. After that the guard tier blocks unconditionally, and the
    /// degraded/normal tiers enforce their TTL against the elapsed time
    /// since the last successful fetch.
    pub fn decide(
        &self,
        quota: Option<&QuotaSnapshot>,
        last_fetch: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FetchDecision {
        let (Some(quota), Some(last_fetch)) = (quota, last_fetch) else {
            return FetchDecision::Fetch;
        };

        if let Some(remaining) = quota.tokens_per_hour.remaining
            && remaining < self.guard_threshold
        {
            return FetchDecision::UseCache {
                reason: format!(
                    "API call blocked: hourly quota critically low ({remaining} tokens remaining)"
                ),
            };
        }

        let degraded = self.is_degraded(quota);
        let ttl = if degraded {
            self.ttl_degraded_secs
        } else {
            self.ttl_normal_secs
        };

        let elapsed = (now - last_fetch).num_seconds().max(0) as u64;
        if elapsed < ttl {
            let mode = if degraded { "degraded" } else { "normal" };
            FetchDecision::UseCache {
                reason: format!(
                    "Using cached data, next fetch in {}s (mode: {mode})",
                    ttl - elapsed
                ),
            }
        } else {
            FetchDecision::Fetch
        }
    }
}
