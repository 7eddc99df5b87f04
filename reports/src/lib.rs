pub mod historical;
pub mod join;
pub mod realtime;
pub mod snapshot;
pub mod types;

pub use historical::build_historical_report;
pub use realtime::build_realtime_report;
pub use snapshot::{InMemorySnapshotStore, SnapshotError, SnapshotPoint, SnapshotStore};
pub use types::{
    HistoricalReport, HistoricalRow, MarketerFilter, PurchaseMarker, RealtimeReport, RealtimeRow,
    ReportTotals,
};
