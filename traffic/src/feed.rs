//! Scheduler-gated access to the realtime traffic upstream.
//!
//! One `TrafficFeed` holds the per-session cache and quota state. Every
//! report request goes through [`TrafficFeed::poll`], which runs the
//! read-decide-write sequence under a single lock so two concurrent
//! requests can never both decide to fetch and double-spend quota.

use crate::cache::FetchCache;
use crate::quota::QuotaSnapshot;
use crate::scheduler::{FetchDecision, QuotaPolicy};
use crate::source::{TrafficError, TrafficSource};
use crate::types::{RealtimeSnapshot, TrafficRow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Where the rows in a [`FeedSample`] came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ServedFrom {
    /// Fresh from the upstream API.
    Live,
    /// The cached snapshot; the reason is informational, not an error.
    Cached { reason: String },
    /// Nothing cached and the upstream failed; the sample is empty.
    Unavailable,
}

/// One poll result: the traffic rows to report on plus the state needed
/// to render quota/caching banners.
#[derive(Clone, Debug, Serialize)]
pub struct FeedSample {
    pub rows: Vec<TrafficRow>,
    pub quota: Option<QuotaSnapshot>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub active_users_5min: u64,
    pub active_users_30min: u64,
    pub served: ServedFrom,
    pub warnings: Vec<String>,
}

pub struct TrafficFeed {
    source: Arc<dyn TrafficSource>,
    policy: QuotaPolicy,
    properties: Vec<String>,
    cache: Mutex<FetchCache>,
}

impl TrafficFeed {
    /// Creates a feed with an empty cache. The first poll always fetches.
    pub fn new(source: Arc<dyn TrafficSource>, policy: QuotaPolicy, properties: Vec<String>) -> Self {
        TrafficFeed {
            source,
            policy,
            properties,
            cache: Mutex::new(FetchCache::new()),
        }
    }

    /// Returns the rows to report on, fetching from the upstream only when
    /// the quota policy allows it. A failed fetch never clobbers the cache:
    /// the last good snapshot is served and the failure becomes a warning.
    pub async fn poll(&self, now: DateTime<Utc>) -> FeedSample {
        let mut cache = self.cache.lock().await;

        match self.policy.decide(cache.quota(), cache.fetched_at(), now) {
            FetchDecision::Fetch => match self.fetch_batch().await {
                Ok(snapshot) => {
                    let mut warnings = Vec::new();
                    if self.policy.is_degraded(&snapshot.quota) {
                        tracing::warn!(
                            remaining = ?snapshot.quota.tokens_per_hour.remaining,
                            "hourly quota is low, refresh interval degraded"
                        );
                        warnings.push(
                            "Hourly quota is low: refresh slowed to the degraded interval"
                                .to_string(),
                        );
                    }
                    cache.apply(snapshot);
                    metrics::counter!("traffic.fetch.live").increment(1);
                    Self::sample(&cache, ServedFrom::Live, warnings)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "realtime traffic fetch failed, serving last good snapshot");
                    metrics::counter!("traffic.fetch.failed").increment(1);
                    let served = if cache.is_empty() {
                        ServedFrom::Unavailable
                    } else {
                        ServedFrom::Cached {
                            reason: "Upstream fetch failed, showing the last good snapshot"
                                .to_string(),
                        }
                    };
                    Self::sample(&cache, served, vec![e.to_string()])
                }
            },
            FetchDecision::UseCache { reason } => {
                metrics::counter!("traffic.fetch.cached").increment(1);
                Self::sample(&cache, ServedFrom::Cached { reason }, Vec::new())
            }
        }
    }

    /// Fetches every configured property concurrently as one atomic unit:
    /// any failure fails the whole batch and leaves the cache untouched.
    async fn fetch_batch(&self) -> Result<RealtimeSnapshot, TrafficError> {
        let mut join_set = JoinSet::new();
        for property in self.properties.clone() {
            let source = Arc::clone(&self.source);
            join_set.spawn(async move {
                let result = source.fetch_realtime(&property).await;
                (property, result)
            });
        }

        let mut by_property = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (property, result) = joined.map_err(|e| TrafficError::Upstream {
                property: "<batch>".to_string(),
                message: e.to_string(),
            })?;
            by_property.insert(property, result?);
        }

        Ok(self.merge_batch(by_property))
    }

    /// Merges per-property snapshots in configured property order. Rows are
    /// tagged with their source property when more than one property feeds
    /// the report.
    fn merge_batch(&self, mut by_property: HashMap<String, RealtimeSnapshot>) -> RealtimeSnapshot {
        let tag_rows = self.properties.len() > 1;
        let mut rows = Vec::new();
        let mut quotas = Vec::new();
        let mut fetched_at: Option<DateTime<Utc>> = None;
        let mut active_users_5min = 0;
        let mut active_users_30min = 0;

        for property in &self.properties {
            let Some(snapshot) = by_property.remove(property) else {
                continue;
            };
            rows.extend(snapshot.rows.into_iter().map(|mut row| {
                if tag_rows {
                    row.property = Some(property.clone());
                }
                row
            }));
            quotas.push(snapshot.quota);
            fetched_at = Some(match fetched_at {
                Some(at) => at.max(snapshot.fetched_at),
                None => snapshot.fetched_at,
            });
            active_users_5min += snapshot.active_users_5min;
            active_users_30min += snapshot.active_users_30min;
        }

        RealtimeSnapshot {
            rows,
            quota: QuotaSnapshot::merge_batch(quotas.iter()).unwrap_or_default(),
            fetched_at: fetched_at.unwrap_or_else(Utc::now),
            active_users_5min,
            active_users_30min,
        }
    }

    fn sample(cache: &FetchCache, served: ServedFrom, warnings: Vec<String>) -> FeedSample {
        let (active_users_5min, active_users_30min) = cache.kpis();
        FeedSample {
            rows: cache.rows().to_vec(),
            quota: cache.quota().copied(),
            fetched_at: cache.fetched_at(),
            active_users_5min,
            active_users_30min,
            served,
            warnings,
        }
    }
}
