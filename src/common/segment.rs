//! Segment identity and metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, individually placeable unit of stored columnar data.
///
/// Segments are identified by a unique string identifier; the interval and
/// data-source fields are carried for rule matching and telemetry but the
/// reconciliation engine only cares about identity and size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique identifier, stable for the lifetime of the segment
    pub id: String,
    /// Owning data source (table)
    pub datasource: String,
    /// Time interval covered by this segment
    pub interval: SegmentInterval,
    /// Version string, newer versions shadow older ones
    pub version: String,
    /// Size on disk in bytes
    pub size: u64,
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SegmentInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Does this interval overlap `other`?
    pub fn overlaps(&self, other: &SegmentInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Does this interval contain the instant `t`?
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

impl Segment {
    pub fn new(
        id: impl Into<String>,
        datasource: impl Into<String>,
        interval: SegmentInterval,
        version: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            datasource: datasource.into(),
            interval,
            version: version.into(),
            size,
        }
    }

    /// Unique identifier of this segment
    pub fn identifier(&self) -> &str {
        &self.id
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Segment {}

impl std::hash::Hash for Segment {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn interval(start_h: u32, end_h: u32) -> SegmentInterval {
        SegmentInterval::new(
            Utc.with_ymd_and_hms(2024, 1, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, end_h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_interval_overlap() {
        assert!(interval(0, 2).overlaps(&interval(1, 3)));
        assert!(!interval(0, 1).overlaps(&interval(1, 2)));
        assert!(interval(0, 4).overlaps(&interval(1, 2)));
    }

    #[test]
    fn test_segment_identity() {
        let a = Segment::new("seg-1", "events", interval(0, 1), "v1", 100);
        let mut b = a.clone();
        b.size = 200;
        assert_eq!(a, b);
        assert_eq!(a.identifier(), "seg-1");
    }
}
