use crate::types::{HistoricalTrafficRow, RealtimeSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::segment::Segment;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("Upstream fetch failed for property {property}: {message}")]
    Upstream { property: String, message: String },

    #[error("Malformed upstream payload for property {property}: {message}")]
    MalformedPayload { property: String, message: String },
}

/// External analytics collaborator.
///
/// Implementations own credentials, transport and payload decoding; this
/// crate only consumes the contract. A returned error means "no new data"
/// to the caller: the feed falls back to its last good snapshot and the
/// failure is surfaced as a warning, never a fault.
#[async_trait]
pub trait TrafficSource: Send + Sync {
    async fn fetch_realtime(&self, property_id: &str) -> Result<RealtimeSnapshot, TrafficError>;

    /// Fetches sessions/users per page over a date range, segmented as
    /// requested. Rows carry their segment bucket when `segment` is not
    /// `Summary`.
    async fn fetch_historical(
        &self,
        property_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        segment: Segment,
    ) -> Result<Vec<HistoricalTrafficRow>, TrafficError>;
}
