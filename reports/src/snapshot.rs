//! Persisted marketer trend snapshots.
//!
//! After each live refresh the per-marketer active-user summary is
//! appended to an external store; the trend view queries it back out.
//! The store itself (key-value, relational, whatever) is a collaborator
//! behind this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot store error: {0}")]
    Store(String),
}

/// One persisted observation: a marketer's active users at an instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotPoint {
    pub at: DateTime<Utc>,
    pub marketer: String,
    pub active_users: u64,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Appends one refresh's marketer summary.
    async fn append(
        &self,
        summary: &IndexMap<String, u64>,
        at: DateTime<Utc>,
    ) -> Result<(), SnapshotError>;

    /// Points at or after `since`, ordered by time.
    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<SnapshotPoint>, SnapshotError>;
}

/// Keeps snapshots in process memory. Backs tests and single-process
/// deployments without an external store.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    points: Mutex<Vec<SnapshotPoint>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn append(
        &self,
        summary: &IndexMap<String, u64>,
        at: DateTime<Utc>,
    ) -> Result<(), SnapshotError> {
        let mut points = self
            .points
            .lock()
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        for (marketer, active_users) in summary {
            points.push(SnapshotPoint {
                at,
                marketer: marketer.clone(),
                active_users: *active_users,
            });
        }
        Ok(())
    }

    async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<SnapshotPoint>, SnapshotError> {
        let points = self
            .points
            .lock()
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        let mut selected: Vec<SnapshotPoint> =
            points.iter().filter(|p| p.at >= since).cloned().collect();
        selected.sort_by_key(|p| p.at);
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn append_and_query_round_trip() {
        let store = InMemorySnapshotStore::new();
        let now = Utc::now();

        let mut summary = IndexMap::new();
        summary.insert("An".to_string(), 42u64);
        summary.insert("Binh".to_string(), 7u64);
        store.append(&summary, now).await.unwrap();

        let mut older = IndexMap::new();
        older.insert("An".to_string(), 5u64);
        store
            .append(&older, now - Duration::hours(2))
            .await
            .unwrap();

        let recent = store
            .query_since(now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|p| p.at == now));

        let all = store.query_since(now - Duration::hours(3)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].active_users, 5);
    }
}
