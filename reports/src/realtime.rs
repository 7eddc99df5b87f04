//! Realtime merge and metrics pipeline.
//!
//! Pure with respect to its inputs: one feed sample plus one purchase
//! event stream in, one report out. The only environmental parameter is
//! the timezone used to render purchase times as local wall-clock.

use crate::join::{JoinKey, group_purchases};
use crate::types::{PurchaseMarker, RealtimeReport, RealtimeRow, safe_rate};
use attribution::SymbolTable;
use chrono::TimeZone;
use commerce::PurchaseEvent;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;
use traffic::FeedSample;

const MINUTE_BUCKETS: usize = 30;

/// Builds the realtime report from one feed sample and the purchase
/// events of the same window.
///
/// An empty traffic payload produces a well-formed empty report that
/// keeps the sample's last-known KPI pair, so the caller always has
/// something to render.
pub fn build_realtime_report<Tz>(
    sample: FeedSample,
    purchases: &[PurchaseEvent],
    table: &SymbolTable,
    tz: &Tz,
) -> RealtimeReport
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if sample.rows.is_empty() {
        return RealtimeReport {
            fetched_at: sample.fetched_at,
            active_users_5min: sample.active_users_5min,
            active_users_30min: sample.active_users_30min,
            total_views: 0,
            purchase_count_30min: 0,
            conversion_rate_30min: 0.0,
            rows: Vec::new(),
            per_minute_active_users: vec![0; MINUTE_BUCKETS],
            purchase_markers: Vec::new(),
            marketer_summary: IndexMap::new(),
            quota: sample.quota,
            served: sample.served,
            warnings: sample.warnings,
        };
    }

    let total_views = sample.rows.iter().map(|row| row.views).sum();
    let purchase_count_30min = purchases.iter().map(|event| event.quantity).sum();

    let mut per_minute_active_users = vec![0u64; MINUTE_BUCKETS];
    for row in &sample.rows {
        if let Some(bucket) = per_minute_active_users.get_mut(row.minutes_ago as usize) {
            *bucket += row.active_users;
        }
    }

    let rows = merge_rows(&sample.rows, purchases, table, tz);

    let mut marketer_summary: IndexMap<String, u64> = IndexMap::new();
    for row in &rows {
        *marketer_summary.entry(row.marketer.clone()).or_default() += row.active_users;
    }

    RealtimeReport {
        fetched_at: sample.fetched_at,
        active_users_5min: sample.active_users_5min,
        active_users_30min: sample.active_users_30min,
        total_views,
        purchase_count_30min,
        conversion_rate_30min: safe_rate(purchase_count_30min, sample.active_users_30min),
        rows,
        per_minute_active_users,
        purchase_markers: purchase_markers(purchases, table),
        marketer_summary,
        quota: sample.quota,
        served: sample.served,
        warnings: sample.warnings,
    }
}

/// Joins grouped traffic against grouped purchases on the attributed
/// identity. Traffic with no matching purchases zero-fills rather than
/// erroring: an unsold page is a normal report line.
fn merge_rows<Tz>(
    traffic_rows: &[traffic::TrafficRow],
    purchases: &[PurchaseEvent],
    table: &SymbolTable,
    tz: &Tz,
) -> Vec<RealtimeRow>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    // Sum the minute buckets per page first; attribution runs once per
    // page, not once per observation.
    let mut traffic_groups: IndexMap<(String, Option<String>), (u64, u64)> = IndexMap::new();
    for row in traffic_rows {
        let entry = traffic_groups
            .entry((row.title.clone(), row.property.clone()))
            .or_default();
        entry.0 += row.active_users;
        entry.1 += row.views;
    }

    let purchase_groups = group_purchases(purchases, table);

    let mut rows: Vec<RealtimeRow> = traffic_groups
        .into_iter()
        .map(|((title, property), (active_users, views))| {
            let entity = table.attribute(&title);
            let matched = purchase_groups.get(&JoinKey {
                core_title: entity.core_title,
                symbol: entity.symbol,
                segment: None,
            });

            let purchases = matched.map_or(0, |group| group.purchases);
            let revenue = matched.map_or(Decimal::ZERO, |group| group.revenue);
            let last_purchase = matched.and_then(|group| group.last_purchase);

            RealtimeRow {
                marketer: table.marketer_for(&title).to_string(),
                user_cr: safe_rate(purchases, active_users),
                view_cr: safe_rate(purchases, views),
                last_purchase_local: last_purchase
                    .map(|at| at.with_timezone(tz).format("%H:%M:%S").to_string())
                    .unwrap_or_default(),
                title,
                property,
                active_users,
                views,
                purchases,
                revenue,
                last_purchase,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.active_users.cmp(&a.active_users));
    rows
}

/// Attributed purchases only; unattributed products carry no marketer and
/// cannot be placed on a marketer trend line.
fn purchase_markers(purchases: &[PurchaseEvent], table: &SymbolTable) -> Vec<PurchaseMarker> {
    purchases
        .iter()
        .filter_map(|event| {
            let marketer = table.marketer_for(&event.product_title);
            if marketer.is_empty() {
                return None;
            }
            Some(PurchaseMarker {
                created_at: event.created_at,
                marketer: marketer.to_string(),
                product_symbol: table.product_symbol_for(&event.product_title).to_string(),
            })
        })
        .collect()
}
