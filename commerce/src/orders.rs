//! Order wire payloads and their flattening into purchase events.
//!
//! The storefront admin API reports money fields as decimal strings and a
//! shipping fee at the order level only. Flattening spreads that fee
//! across line items proportionally to each item's share of the order
//! subtotal, so per-item revenue adds up to what the buyer actually paid.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::segment::SegmentKey;

/// One order line item, normalized for reporting. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseEvent {
    pub product_title: String,
    pub quantity: u64,
    /// Item value plus this item's share of the order shipping fee.
    pub revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub store_id: String,
    /// Reporting bucket, only set on the historical path.
    pub segment: Option<SegmentKey>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersPage {
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub subtotal_price: Decimal,
    pub total_shipping_price_set: Option<PriceSet>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct PriceSet {
    pub shop_money: Money,
}

#[derive(Debug, Deserialize)]
pub struct Money {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub price: Decimal,
    pub quantity: u64,
}

/// Share of an order-level shipping fee carried by one line item. The fee
/// has no natural per-item assignment, so it is split by value share; an
/// order with a zero subtotal allocates nothing.
pub fn shipping_allocation(item_total: Decimal, subtotal: Decimal, shipping_fee: Decimal) -> Decimal {
    if subtotal > Decimal::ZERO {
        shipping_fee * item_total / subtotal
    } else {
        Decimal::ZERO
    }
}

impl Order {
    fn shipping_fee(&self) -> Decimal {
        self.total_shipping_price_set
            .as_ref()
            .map(|set| set.shop_money.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Flattens the order into one purchase event per line item.
    pub fn into_events(
        self,
        store_id: &str,
        segment_for: impl Fn(&DateTime<Utc>) -> Option<SegmentKey>,
    ) -> Vec<PurchaseEvent> {
        let subtotal = self.subtotal_price;
        let shipping_fee = self.shipping_fee();
        let created_at = self.created_at;

        self.line_items
            .into_iter()
            .map(|item| {
                let item_total = item.price * Decimal::from(item.quantity);
                PurchaseEvent {
                    product_title: item.title,
                    quantity: item.quantity,
                    revenue: item_total + shipping_allocation(item_total, subtotal, shipping_fee),
                    created_at,
                    store_id: store_id.to_string(),
                    segment: segment_for(&created_at),
                }
            })
            .collect()
    }
}
