use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::segment::{Segment, SegmentKey};
use traffic::{QuotaSnapshot, ServedFrom};

/// Purchases per active user (or per view/session), as a percentage. A
/// zero denominator yields 0.0 so an unvisited page can never surface a
/// NaN or a division fault.
pub(crate) fn safe_rate(count: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        count as f64 / denominator as f64 * 100.0
    }
}

/// Restricts report rows to one marketer's entities. Privileged viewers
/// see everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketerFilter {
    All,
    Only(String),
}

impl MarketerFilter {
    pub fn allows(&self, marketer: &str) -> bool {
        match self {
            MarketerFilter::All => true,
            MarketerFilter::Only(id) => id == marketer,
        }
    }
}

/// One output line of the realtime report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RealtimeRow {
    pub title: String,
    pub property: Option<String>,
    pub marketer: String,
    pub active_users: u64,
    pub views: u64,
    pub purchases: u64,
    pub revenue: Decimal,
    pub last_purchase: Option<DateTime<Utc>>,
    /// `last_purchase` rendered as wall-clock time in the viewer's
    /// timezone ("HH:MM:SS"); empty when there is no purchase.
    pub last_purchase_local: String,
    pub user_cr: f64,
    pub view_cr: f64,
}

/// A single attributed purchase, used to annotate the live trend view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurchaseMarker {
    pub created_at: DateTime<Utc>,
    pub marketer: String,
    pub product_symbol: String,
}

/// The complete realtime report for one refresh.
#[derive(Clone, Debug, Serialize)]
pub struct RealtimeReport {
    pub fetched_at: Option<DateTime<Utc>>,
    pub active_users_5min: u64,
    pub active_users_30min: u64,
    pub total_views: u64,
    pub purchase_count_30min: u64,
    pub conversion_rate_30min: f64,
    pub rows: Vec<RealtimeRow>,
    /// Total active users per minute bucket; index = minutes ago, always
    /// 30 entries.
    pub per_minute_active_users: Vec<u64>,
    pub purchase_markers: Vec<PurchaseMarker>,
    /// Marketer → total active users, for the persisted trend snapshot.
    pub marketer_summary: IndexMap<String, u64>,
    pub quota: Option<QuotaSnapshot>,
    pub served: ServedFrom,
    pub warnings: Vec<String>,
}

impl RealtimeReport {
    /// Drops rows, markers and summary entries outside the filter.
    pub fn restricted_to(mut self, filter: &MarketerFilter) -> Self {
        if matches!(filter, MarketerFilter::All) {
            return self;
        }
        self.rows.retain(|row| filter.allows(&row.marketer));
        self.purchase_markers
            .retain(|marker| filter.allows(&marker.marketer));
        self.marketer_summary
            .retain(|marketer, _| filter.allows(marketer));
        self
    }
}

/// One output line of the historical report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoricalRow {
    /// Day or week bucket; `None` in summary mode.
    pub segment: Option<SegmentKey>,
    pub title: String,
    pub marketer: String,
    pub sessions: u64,
    pub users: u64,
    pub purchases: u64,
    pub revenue: Decimal,
    pub session_cr: f64,
    pub user_cr: f64,
}

/// Range-wide totals, computed here so the presentation layer can render
/// a totals row without re-aggregating.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub sessions: u64,
    pub users: u64,
    pub purchases: u64,
    pub revenue: Decimal,
    pub session_cr: f64,
    pub user_cr: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoricalReport {
    pub segment_mode: Segment,
    pub rows: Vec<HistoricalRow>,
    pub totals: ReportTotals,
    pub warnings: Vec<String>,
}

impl HistoricalReport {
    /// Drops rows below a purchase floor, recomputing totals. Used by
    /// segmented views to hide long tails of zero-purchase buckets.
    pub fn with_min_purchases(mut self, min_purchases: u64) -> Self {
        self.rows.retain(|row| row.purchases >= min_purchases);
        self.totals = ReportTotals::from_rows(&self.rows);
        self
    }

    pub fn restricted_to(mut self, filter: &MarketerFilter) -> Self {
        if matches!(filter, MarketerFilter::All) {
            return self;
        }
        self.rows.retain(|row| filter.allows(&row.marketer));
        self.totals = ReportTotals::from_rows(&self.rows);
        self
    }
}

impl ReportTotals {
    pub fn from_rows(rows: &[HistoricalRow]) -> Self {
        let mut totals = ReportTotals::default();
        for row in rows {
            totals.sessions += row.sessions;
            totals.users += row.users;
            totals.purchases += row.purchases;
            totals.revenue += row.revenue;
        }
        totals.session_cr = safe_rate(totals.purchases, totals.sessions);
        totals.user_cr = safe_rate(totals.purchases, totals.users);
        totals
    }
}
