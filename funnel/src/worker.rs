//! Periodic refresh loop for the realtime dashboard.
//!
//! The worker ticks at the configured cadence and pushes each report to
//! the presentation layer over a channel. A command channel interrupts
//! the wait: `Refresh` forces an immediate report outside the cadence,
//! `Shutdown` (or dropping either channel end) stops the loop. A refresh
//! interrupted mid-fetch leaves the cache untouched: a fetch either
//! completes and replaces the snapshot wholesale, or it is a no-op.

use crate::session::Session;
use chrono::Utc;
use reports::RealtimeReport;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

pub enum Command {
    /// Trigger a refresh outside of the normal cadence. The worker sends
    /// the resulting report back when the attempt finishes.
    Refresh(oneshot::Sender<RealtimeReport>),
    /// Stop the loop promptly.
    Shutdown,
}

impl Session {
    /// Runs until `Shutdown` arrives, the command channel closes, or the
    /// report receiver goes away. The first tick fires immediately.
    pub async fn run_refresh_worker(
        &self,
        mut commands: mpsc::Receiver<Command>,
        reports: mpsc::Sender<RealtimeReport>,
    ) {
        let tz = self.reporting_timezone();
        let mut ticker = tokio::time::interval(self.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.realtime_report(Utc::now(), &tz).await;
                    if reports.send(report).await.is_err() {
                        tracing::debug!("report receiver dropped, stopping refresh worker");
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Refresh(reply)) => {
                        let report = self.realtime_report(Utc::now(), &tz).await;
                        let _ = reply.send(report);
                    }
                    Some(Command::Shutdown) | None => {
                        tracing::debug!("refresh worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use attribution::MappingConfig;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use shared::segment::Segment;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use traffic::{
        HistoricalTrafficRow, QuotaSnapshot, RealtimeSnapshot, TokenBucket, TrafficError,
        TrafficRow, TrafficSource,
    };

    struct FakeTraffic {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TrafficSource for FakeTraffic {
        async fn fetch_realtime(
            &self,
            _property_id: &str,
        ) -> Result<RealtimeSnapshot, TrafficError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RealtimeSnapshot {
                rows: vec![TrafficRow {
                    title: "Landing 🔥".to_string(),
                    minutes_ago: 0,
                    active_users: 3,
                    views: 9,
                    property: None,
                }],
                quota: QuotaSnapshot {
                    tokens_per_hour: TokenBucket {
                        consumed: 10,
                        remaining: Some(4990),
                    },
                    tokens_per_day: TokenBucket::default(),
                },
                fetched_at: Utc::now(),
                active_users_5min: 1,
                active_users_30min: 3,
            })
        }

        async fn fetch_historical(
            &self,
            _property_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _segment: Segment,
        ) -> Result<Vec<HistoricalTrafficRow>, TrafficError> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> Config {
        let mut page_title_map = IndexMap::new();
        page_title_map.insert("🔥".to_string(), "An".to_string());
        Config {
            property_ids: vec!["506473229".to_string()],
            quota: Default::default(),
            stores: Vec::new(),
            mappings: MappingConfig {
                page_title_map,
                product_to_symbol_map: IndexMap::new(),
                default_product_symbol: "🛒".to_string(),
            },
            reporting: Default::default(),
            refresh_interval_secs: 75,
        }
    }

    #[tokio::test]
    async fn worker_reports_on_ticks_and_shuts_down() {
        let session = Arc::new(
            Session::new(test_config(), Arc::new(FakeTraffic { calls: AtomicUsize::new(0) }), None)
                .unwrap(),
        );
        let (command_tx, command_rx) = mpsc::channel(4);
        let (report_tx, mut report_rx) = mpsc::channel(4);

        let worker_session = Arc::clone(&session);
        let worker = tokio::spawn(async move {
            worker_session
                .run_refresh_worker(command_rx, report_tx)
                .await;
        });

        // First tick fires immediately.
        let report = report_rx.recv().await.expect("first report");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].marketer, "An");

        command_tx.send(Command::Shutdown).await.unwrap();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn on_demand_refresh_replies_with_a_report() {
        let session = Arc::new(
            Session::new(test_config(), Arc::new(FakeTraffic { calls: AtomicUsize::new(0) }), None)
                .unwrap(),
        );
        let (command_tx, command_rx) = mpsc::channel(4);
        let (report_tx, mut report_rx) = mpsc::channel(4);

        let worker_session = Arc::clone(&session);
        let worker = tokio::spawn(async move {
            worker_session
                .run_refresh_worker(command_rx, report_tx)
                .await;
        });

        // Drain the immediate first tick.
        report_rx.recv().await.expect("first report");

        let (reply_tx, reply_rx) = oneshot::channel();
        command_tx.send(Command::Refresh(reply_tx)).await.unwrap();
        let report = reply_rx.await.expect("refresh reply");
        assert_eq!(report.active_users_30min, 3);

        drop(command_tx);
        worker.await.unwrap();
    }
}
