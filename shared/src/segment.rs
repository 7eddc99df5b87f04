//! Report segmentation keys shared by the traffic, commerce and report
//! pipelines. Both upstream datasets are bucketed with the same key type so
//! the join in `reports` can line them up without knowing which source a
//! group came from.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// How a historical report is segmented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Segment {
    /// One row per entity over the whole date range.
    Summary,
    ByDay,
    ByWeek,
}

/// Concrete bucket value attached to a grouped row.
///
/// Within one report only one variant occurs, selected by the `Segment`
/// mode. Weeks are kept as the upstream's opaque `year-week` label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SegmentKey {
    Day(chrono::NaiveDate),
    Week(String),
}

impl SegmentKey {
    /// Buckets a UTC instant under the requested segmentation, evaluated in
    /// the reporting timezone. `Summary` has no bucket.
    pub fn bucket<Tz>(segment: Segment, at: &DateTime<Utc>, tz: &Tz) -> Option<SegmentKey>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let local = at.with_timezone(tz);
        match segment {
            Segment::Summary => None,
            Segment::ByDay => Some(SegmentKey::Day(local.date_naive())),
            Segment::ByWeek => Some(SegmentKey::Week(local.format("%Y-%U").to_string())),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKey::Day(date) => write!(f, "{date}"),
            SegmentKey::Week(week) => write!(f, "{week}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        rfc3339.parse().unwrap()
    }

    #[test]
    fn summary_has_no_bucket() {
        let ts = at("2024-06-03T10:00:00Z");
        assert_eq!(SegmentKey::bucket(Segment::Summary, &ts, &Utc), None);
    }

    #[test]
    fn day_bucket_respects_reporting_timezone() {
        // 23:30 UTC is already the next day at UTC+7.
        let ts = at("2024-06-03T23:30:00Z");
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();

        assert_eq!(
            SegmentKey::bucket(Segment::ByDay, &ts, &tz),
            Some(SegmentKey::Day("2024-06-04".parse().unwrap()))
        );
        assert_eq!(
            SegmentKey::bucket(Segment::ByDay, &ts, &Utc),
            Some(SegmentKey::Day("2024-06-03".parse().unwrap()))
        );
    }

    #[test]
    fn week_bucket_uses_year_week_label() {
        let ts = at("2024-01-10T00:00:00Z");
        assert_eq!(
            SegmentKey::bucket(Segment::ByWeek, &ts, &Utc),
            Some(SegmentKey::Week("2024-01".to_string()))
        );
    }

    #[test]
    fn day_keys_order_chronologically() {
        let earlier = SegmentKey::Day("2024-06-03".parse().unwrap());
        let later = SegmentKey::Day("2024-06-04".parse().unwrap());
        assert!(earlier < later);
    }
}
