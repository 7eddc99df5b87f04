//! Historical segmentation pipeline.
//!
//! The realtime join generalized over an optional day/week bucket, with
//! sessions/users as the rate denominators. Aggregation is two-phase:
//! traffic rows are grouped per composite key first, then each group is
//! joined once against the purchase groups, so a key that appears in
//! several raw traffic rows still counts its purchases exactly once.

use crate::join::{JoinKey, group_purchases};
use crate::types::{HistoricalReport, HistoricalRow, ReportTotals, safe_rate};
use attribution::SymbolTable;
use commerce::PurchaseEvent;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use shared::segment::Segment;
use traffic::HistoricalTrafficRow;

/// Builds the historical report for one date range.
///
/// Empty traffic input produces a well-formed empty report. In summary
/// mode rows order by sessions descending; segmented modes order by the
/// segment bucket ascending, then sessions descending.
pub fn build_historical_report(
    traffic_rows: &[HistoricalTrafficRow],
    purchases: &[PurchaseEvent],
    table: &SymbolTable,
    segment_mode: Segment,
    warnings: Vec<String>,
) -> HistoricalReport {
    struct TrafficGroup {
        title: String,
        sessions: u64,
        users: u64,
    }

    // Phase one: reduce raw traffic rows onto the composite key, keeping
    // the first title seen per key as the display title.
    let mut traffic_groups: IndexMap<JoinKey, TrafficGroup> = IndexMap::new();
    for row in traffic_rows {
        let entity = table.attribute(&row.title);
        let key = JoinKey {
            core_title: entity.core_title,
            symbol: entity.symbol,
            segment: row.segment.clone(),
        };
        let group = traffic_groups.entry(key).or_insert_with(|| TrafficGroup {
            title: row.title.clone(),
            sessions: 0,
            users: 0,
        });
        group.sessions += row.sessions;
        group.users += row.users;
    }

    let purchase_groups = group_purchases(purchases, table);

    // Phase two: one join per key; missing purchases zero-fill.
    let mut rows: Vec<HistoricalRow> = traffic_groups
        .into_iter()
        .map(|(key, group)| {
            let matched = purchase_groups.get(&key);
            let purchases = matched.map_or(0, |g| g.purchases);
            let revenue = matched.map_or(Decimal::ZERO, |g| g.revenue);

            HistoricalRow {
                marketer: table.marketer_for(&group.title).to_string(),
                session_cr: safe_rate(purchases, group.sessions),
                user_cr: safe_rate(purchases, group.users),
                segment: key.segment,
                title: group.title,
                sessions: group.sessions,
                users: group.users,
                purchases,
                revenue,
            }
        })
        .collect();

    match segment_mode {
        Segment::Summary => rows.sort_by(|a, b| b.sessions.cmp(&a.sessions)),
        Segment::ByDay | Segment::ByWeek => rows.sort_by(|a, b| {
            a.segment
                .cmp(&b.segment)
                .then(b.sessions.cmp(&a.sessions))
        }),
    }

    let totals = ReportTotals::from_rows(&rows);
    HistoricalReport {
        segment_mode,
        rows,
        totals,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribution::MappingConfig;
    use rust_decimal_macros::dec;
    use shared::segment::SegmentKey;

    fn table() -> SymbolTable {
        let mut page_title_map = IndexMap::new();
        page_title_map.insert("🔥".to_string(), "An".to_string());
        SymbolTable::new(MappingConfig {
            page_title_map,
            product_to_symbol_map: IndexMap::new(),
            default_product_symbol: "🛒".to_string(),
        })
        .unwrap()
    }

    fn traffic(title: &str, sessions: u64, users: u64, segment: Option<SegmentKey>) -> HistoricalTrafficRow {
        HistoricalTrafficRow {
            title: title.to_string(),
            sessions,
            users,
            segment,
        }
    }

    fn purchase(title: &str, quantity: u64, revenue: Decimal, segment: Option<SegmentKey>) -> PurchaseEvent {
        PurchaseEvent {
            product_title: title.to_string(),
            quantity,
            revenue,
            created_at: "2024-06-03T10:00:00Z".parse().unwrap(),
            store_id: "store-a".to_string(),
            segment,
        }
    }

    fn day(date: &str) -> Option<SegmentKey> {
        Some(SegmentKey::Day(date.parse().unwrap()))
    }

    #[test]
    fn summary_joins_and_orders_by_sessions() {
        let report = build_historical_report(
            &[
                traffic("Glow Serum 🔥", 100, 80, None),
                traffic("Other Page", 300, 250, None),
            ],
            &[purchase("Glow Serum 🔥", 4, dec!(120.00), None)],
            &table(),
            Segment::Summary,
            Vec::new(),
        );

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].title, "Other Page");
        assert_eq!(report.rows[1].purchases, 4);
        assert_eq!(report.rows[1].session_cr, 4.0);
        assert_eq!(report.rows[1].user_cr, 5.0);
        assert_eq!(report.totals.sessions, 400);
        assert_eq!(report.totals.purchases, 4);
        assert_eq!(report.totals.session_cr, 1.0);
    }

    #[test]
    fn by_day_keeps_same_entity_on_different_dates_distinct() {
        let report = build_historical_report(
            &[
                traffic("Glow Serum 🔥", 50, 40, day("2024-06-03")),
                traffic("Glow Serum 🔥", 60, 45, day("2024-06-04")),
            ],
            &[
                purchase("Glow Serum 🔥", 1, dec!(30.00), day("2024-06-03")),
                purchase("Glow Serum 🔥", 2, dec!(60.00), day("2024-06-04")),
            ],
            &table(),
            Segment::ByDay,
            Vec::new(),
        );

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].segment, day("2024-06-03"));
        assert_eq!(report.rows[0].purchases, 1);
        assert_eq!(report.rows[1].segment, day("2024-06-04"));
        assert_eq!(report.rows[1].purchases, 2);
    }

    #[test]
    fn segmented_rows_order_by_bucket_then_sessions() {
        let report = build_historical_report(
            &[
                traffic("B", 10, 10, day("2024-06-04")),
                traffic("A", 5, 5, day("2024-06-03")),
                traffic("C", 99, 99, day("2024-06-04")),
            ],
            &[],
            &table(),
            Segment::ByDay,
            Vec::new(),
        );

        let order: Vec<&str> = report.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(order, ["A", "C", "B"]);
    }

    #[test]
    fn duplicate_traffic_keys_count_purchases_once() {
        // Two raw traffic rows normalize onto the same key; the joined
        // purchases must not double.
        let report = build_historical_report(
            &[
                traffic("Glow Serum 🔥", 100, 80, None),
                traffic("Glow Serum 🔥 – Promo", 20, 15, None),
            ],
            &[purchase("Glow Serum 🔥", 3, dec!(90.00), None)],
            &table(),
            Segment::Summary,
            Vec::new(),
        );

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.sessions, 120);
        assert_eq!(row.users, 95);
        assert_eq!(row.purchases, 3);
        assert_eq!(row.revenue, dec!(90.00));
        assert_eq!(report.totals.purchases, 3);
    }

    #[test]
    fn empty_traffic_yields_empty_report() {
        let report = build_historical_report(
            &[],
            &[purchase("Glow Serum 🔥", 3, dec!(90.00), None)],
            &table(),
            Segment::Summary,
            Vec::new(),
        );
        assert!(report.rows.is_empty());
        assert_eq!(report.totals, ReportTotals::default());
    }

    #[test]
    fn min_purchase_filter_drops_thin_rows() {
        let report = build_historical_report(
            &[
                traffic("Glow Serum 🔥", 100, 80, day("2024-06-03")),
                traffic("Quiet Page", 500, 400, day("2024-06-03")),
            ],
            &[purchase("Glow Serum 🔥", 2, dec!(60.00), day("2024-06-03"))],
            &table(),
            Segment::ByDay,
            Vec::new(),
        )
        .with_min_purchases(1);

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].title, "Glow Serum 🔥");
        assert_eq!(report.totals.sessions, 100);
    }
}
