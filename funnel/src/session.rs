//! One viewer session: the attribution table, the quota-gated traffic
//! feed and the purchase aggregator wired together behind two report
//! entry points. All mutable state (the fetch cache and quota snapshot)
//! lives inside the session's feed; nothing is ambient.

use crate::config::{Config, ConfigError, ReportingConfig};
use attribution::SymbolTable;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use commerce::PurchaseAggregator;
use reports::{
    HistoricalReport, RealtimeReport, SnapshotError, SnapshotPoint, SnapshotStore,
    build_historical_report, build_realtime_report,
};
use shared::segment::Segment;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use traffic::{ServedFrom, TrafficFeed, TrafficSource};

pub struct Session {
    table: SymbolTable,
    feed: TrafficFeed,
    aggregator: PurchaseAggregator,
    source: Arc<dyn TrafficSource>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    properties: Vec<String>,
    reporting: ReportingConfig,
    timezone: FixedOffset,
    refresh_interval: Duration,
}

impl Session {
    /// Validates the config and wires up all collaborators. The session
    /// starts with an empty cache; the first realtime report always
    /// fetches.
    pub fn new(
        config: Config,
        source: Arc<dyn TrafficSource>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Result<Self, ConfigError> {
        let aggregator = PurchaseAggregator::new(&config.stores)?;
        Self::with_aggregator(config, source, aggregator, snapshots)
    }

    /// Like [`Session::new`] but with a pre-built aggregator, for callers
    /// that override store endpoints (proxies, tests).
    pub fn with_aggregator(
        config: Config,
        source: Arc<dyn TrafficSource>,
        aggregator: PurchaseAggregator,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timezone = config.reporting.timezone()?;
        let Config {
            property_ids,
            quota,
            stores: _,
            mappings,
            reporting,
            refresh_interval_secs,
        } = config;

        let table = SymbolTable::new(mappings)?;
        let feed = TrafficFeed::new(Arc::clone(&source), quota, property_ids.clone());

        Ok(Session {
            table,
            feed,
            aggregator,
            source,
            snapshots,
            properties: property_ids,
            reporting,
            timezone,
            refresh_interval: Duration::from_secs(refresh_interval_secs),
        })
    }

    pub fn reporting(&self) -> &ReportingConfig {
        &self.reporting
    }

    /// The configured reporting timezone, validated at construction.
    pub fn reporting_timezone(&self) -> FixedOffset {
        self.timezone
    }

    pub(crate) fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Builds the realtime report for `now`. The traffic side goes
    /// through the quota scheduler; the purchase side is fetched every
    /// time. Always returns a report, possibly served from cache or
    /// empty, never an error.
    pub async fn realtime_report<Tz>(&self, now: DateTime<Utc>, tz: &Tz) -> RealtimeReport
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let sample = self.feed.poll(now).await;
        let purchases = self.aggregator.fetch_realtime(now).await;

        let live = matches!(sample.served, ServedFrom::Live);
        let report = build_realtime_report(sample, &purchases, &self.table, tz);

        if live && let Some(store) = &self.snapshots {
            let at = report.fetched_at.unwrap_or(now);
            if let Err(e) = store.append(&report.marketer_summary, at).await {
                tracing::warn!(error = %e, "failed to persist marketer snapshot");
            }
        }

        report
    }

    /// Builds the historical report for an inclusive date range. A failed
    /// property fetch is skipped with a warning; the report is still
    /// produced from whatever arrived.
    pub async fn historical_report<Tz>(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        segment: Segment,
        tz: &Tz,
    ) -> HistoricalReport
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut warnings = Vec::new();
        let mut traffic_rows = Vec::new();
        for property in &self.properties {
            match self
                .source
                .fetch_historical(property, start, end, segment)
                .await
            {
                Ok(rows) => traffic_rows.extend(rows),
                Err(e) => {
                    tracing::warn!(property = %property, error = %e, "historical traffic fetch failed");
                    warnings.push(e.to_string());
                }
            }
        }

        let purchases = self
            .aggregator
            .fetch_historical(start, end, segment, tz)
            .await;

        build_historical_report(&traffic_rows, &purchases, &self.table, segment, warnings)
    }

    /// Marketer trend points persisted since `since`. Empty when no
    /// snapshot store is configured.
    pub async fn trend_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SnapshotPoint>, SnapshotError> {
        match &self.snapshots {
            Some(store) => store.query_since(since).await,
            None => Ok(Vec::new()),
        }
    }
}
