//! Multi-store purchase aggregation.
//!
//! Every configured store is fetched independently; a failing store is
//! logged and skipped so one broken credential or outage never empties the
//! whole report. Results are merged in configured store order, which keeps
//! the output deterministic regardless of task completion order. Distinct
//! stores never share order identifiers, so no cross-store dedup happens.

use crate::client::StoreClient;
use crate::config::{self, StoreCredentials, ValidationError};
use crate::error::CommerceError;
use crate::orders::{Order, PurchaseEvent};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use shared::segment::{Segment, SegmentKey};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

pub struct PurchaseAggregator {
    clients: Vec<Arc<StoreClient>>,
}

impl PurchaseAggregator {
    /// Validates the store list and builds one client per store.
    pub fn new(stores: &[StoreCredentials]) -> Result<Self, ValidationError> {
        config::validate_stores(stores)?;
        let clients = stores
            .iter()
            .map(|creds| match StoreClient::new(creds) {
                Ok(client) => Ok(Arc::new(client)),
                // A store whose domain cannot even form a URL is a config
                // problem, not a runtime hiccup.
                Err(e) => Err(ValidationError::InvalidShopDomain {
                    store_id: creds.store_id.clone(),
                    message: e.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PurchaseAggregator { clients })
    }

    /// Builds an aggregator from pre-constructed clients, preserving their
    /// order. Used when endpoints are overridden (proxies, tests).
    pub fn from_clients(clients: Vec<StoreClient>) -> Self {
        PurchaseAggregator {
            clients: clients.into_iter().map(Arc::new).collect(),
        }
    }

    /// Line items from orders of the last 30 minutes across all stores.
    pub async fn fetch_realtime(&self, now: DateTime<Utc>) -> Vec<PurchaseEvent> {
        let orders_by_store = self
            .collect_stores(move |client| async move { client.fetch_recent_orders(now).await })
            .await;

        self.flatten(orders_by_store, |_| None)
    }

    /// Line items from all orders in `[start, end]` (inclusive end date,
    /// evaluated in the reporting timezone) across all stores, each event
    /// bucketed under the requested segmentation.
    pub async fn fetch_historical<Tz>(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        segment: Segment,
        tz: &Tz,
    ) -> Vec<PurchaseEvent>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let range_start = local_day_start(tz, start);
        let range_end = local_day_start(tz, end + chrono::Duration::days(1));

        let orders_by_store = self
            .collect_stores(move |client| async move {
                client.fetch_orders_between(range_start, range_end).await
            })
            .await;

        self.flatten(orders_by_store, |created_at| {
            SegmentKey::bucket(segment, created_at, tz)
        })
    }

    /// Runs one fetch per store concurrently, keeping successes and
    /// logging failures away.
    async fn collect_stores<F, Fut>(&self, fetch: F) -> HashMap<usize, Vec<Order>>
    where
        F: Fn(Arc<StoreClient>) -> Fut,
        Fut: Future<Output = Result<Vec<Order>, CommerceError>> + Send + 'static,
    {
        let mut join_set = JoinSet::new();
        for (index, client) in self.clients.iter().enumerate() {
            let store_id = client.store_id().to_string();
            let future = fetch(Arc::clone(client));
            join_set.spawn(async move { (index, store_id, future.await) });
        }

        let mut orders_by_store = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            let Ok((index, store_id, result)) = joined else {
                continue;
            };
            match result {
                Ok(orders) => {
                    orders_by_store.insert(index, orders);
                }
                Err(e) => {
                    tracing::warn!(store = %store_id, error = %e, "skipping store after failed fetch");
                    metrics::counter!("commerce.store.skipped").increment(1);
                }
            }
        }
        orders_by_store
    }

    fn flatten(
        &self,
        mut orders_by_store: HashMap<usize, Vec<Order>>,
        segment_for: impl Fn(&DateTime<Utc>) -> Option<SegmentKey>,
    ) -> Vec<PurchaseEvent> {
        let mut events = Vec::new();
        for (index, client) in self.clients.iter().enumerate() {
            let Some(orders) = orders_by_store.remove(&index) else {
                continue;
            };
            for order in orders {
                events.extend(order.into_events(client.store_id(), &segment_for));
            }
        }
        events
    }
}

/// Midnight of `date` in the reporting timezone, as a UTC instant. An
/// ambiguous or skipped local midnight resolves to its earliest valid
/// interpretation.
fn local_day_start<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}
