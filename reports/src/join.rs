//! The one join both pipelines share.
//!
//! Traffic rows and purchase events have no common identifier, so both
//! sides are reduced to the normalized `(core_title, symbol)` identity
//! (plus an optional segmentation bucket on the historical path) and
//! purchases are looked up per traffic group. The realtime and historical
//! pipelines differ only in their metrics and ordering, not in how they
//! line the two datasets up.

use attribution::SymbolTable;
use chrono::{DateTime, Utc};
use commerce::PurchaseEvent;
use rust_decimal::Decimal;
use shared::segment::SegmentKey;
use std::collections::HashMap;

/// Composite join key for one grouped row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct JoinKey {
    pub core_title: String,
    pub symbol: String,
    pub segment: Option<SegmentKey>,
}

/// Purchase-side aggregate for one join key.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PurchaseGroup {
    pub purchases: u64,
    pub revenue: Decimal,
    pub last_purchase: Option<DateTime<Utc>>,
}

/// Groups purchase events by their attributed identity. Events on the
/// realtime path carry no segment, so their keys collapse onto
/// `(core_title, symbol, None)`.
pub(crate) fn group_purchases(
    events: &[PurchaseEvent],
    table: &SymbolTable,
) -> HashMap<JoinKey, PurchaseGroup> {
    let mut groups: HashMap<JoinKey, PurchaseGroup> = HashMap::new();
    for event in events {
        let entity = table.attribute(&event.product_title);
        let key = JoinKey {
            core_title: entity.core_title,
            symbol: entity.symbol,
            segment: event.segment.clone(),
        };
        let group = groups.entry(key).or_default();
        group.purchases += event.quantity;
        group.revenue += event.revenue;
        group.last_purchase = Some(match group.last_purchase {
            Some(last) => last.max(event.created_at),
            None => event.created_at,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribution::MappingConfig;
    use indexmap::IndexMap;
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

    fn event(title: &str, quantity: u64, revenue: Decimal, at: &str) -> PurchaseEvent {
        PurchaseEvent {
            product_title: title.to_string(),
            quantity,
            revenue,
            created_at: at.parse().unwrap(),
            store_id: "store-a".to_string(),
            segment: None,
        }
    }

    #[test]
    fn same_identity_accumulates() {
        let t = table();
        let events = vec![
            event("Glow Serum 🔥", 2, dec!(66.00), "2024-06-03T10:00:00Z"),
            event("Glow Serum 🔥 – Sale", 1, dec!(33.00), "2024-06-03T10:20:00Z"),
        ];
        let groups = group_purchases(&events, &t);

        assert_eq!(groups.len(), 1);
        let group = groups.values().next().unwrap();
        assert_eq!(group.purchases, 3);
        assert_eq!(group.revenue, dec!(99.00));
        assert_eq!(
            group.last_purchase,
            Some("2024-06-03T10:20:00Z".parse().unwrap())
        );
    }

    #[test]
    fn different_segments_stay_distinct() {
        let t = table();
        let mut monday = event("Glow Serum 🔥", 1, dec!(10), "2024-06-03T10:00:00Z");
        monday.segment = Some(SegmentKey::Day("2024-06-03".parse().unwrap()));
        let mut tuesday = event("Glow Serum 🔥", 1, dec!(10), "2024-06-04T10:00:00Z");
        tuesday.segment = Some(SegmentKey::Day("2024-06-04".parse().unwrap()));

        let groups = group_purchases(&[monday, tuesday], &t);
        assert_eq!(groups.len(), 2);
    }
}
