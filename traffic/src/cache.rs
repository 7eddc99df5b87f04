use crate::quota::QuotaSnapshot;
use crate::types::{RealtimeSnapshot, TrafficRow};
use chrono::{DateTime, Utc};

/// Last good realtime payload for one viewer session.
///
/// `fetched_at` is `Some` iff `payload` is `Some`. Both are replaced
/// together by [`FetchCache::apply`] and never mutated piecemeal, so a
/// failed fetch can simply not call `apply` and the previous snapshot
/// stays intact.
#[derive(Debug, Default)]
pub struct FetchCache {
    payload: Option<Vec<TrafficRow>>,
    fetched_at: Option<DateTime<Utc>>,
    quota: Option<QuotaSnapshot>,
    active_users_5min: u64,
    active_users_30min: u64,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached snapshot wholesale with a successful fetch.
    pub fn apply(&mut self, snapshot: RealtimeSnapshot) {
        self.payload = Some(snapshot.rows);
        self.fetched_at = Some(snapshot.fetched_at);
        self.quota = Some(snapshot.quota);
        self.active_users_5min = snapshot.active_users_5min;
        self.active_users_30min = snapshot.active_users_30min;
    }

    pub fn rows(&self) -> &[TrafficRow] {
        self.payload.as_deref().unwrap_or_default()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn quota(&self) -> Option<&QuotaSnapshot> {
        self.quota.as_ref()
    }

    /// The last observed headline KPI pair. Survives empty windows so a
    /// report rendered from an empty payload still shows the previous
    /// numbers instead of flashing to zero.
    pub fn kpis(&self) -> (u64, u64) {
        (self.active_users_5min, self.active_users_30min)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}
