use crate::quota::QuotaSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::segment::SegmentKey;

/// One (page, minute-bucket) observation from the realtime analytics API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrafficRow {
    pub title: String,
    /// Minute bucket, 0..=29 minutes before the fetch.
    pub minutes_ago: u32,
    pub active_users: u64,
    pub views: u64,
    /// Set when more than one analytics property feeds the same report.
    pub property: Option<String>,
}

/// One page observation from the historical analytics API. Carries
/// sessions/users instead of the realtime active-user metrics, plus the
/// segmentation bucket when a segmented report was requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoricalTrafficRow {
    pub title: String,
    pub sessions: u64,
    pub users: u64,
    pub segment: Option<SegmentKey>,
}

/// Everything a single successful realtime fetch returns: the page rows,
/// the quota accounting reported alongside them, and the two headline
/// active-user KPIs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealtimeSnapshot {
    pub rows: Vec<TrafficRow>,
    pub quota: QuotaSnapshot,
    pub fetched_at: DateTime<Utc>,
    pub active_users_5min: u64,
    pub active_users_30min: u64,
}
