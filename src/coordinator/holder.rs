//! Per-server view used for placement decisions

use crate::common::Segment;
use crate::coordinator::peon::LoadQueuePeon;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Immutable identity and capacity of a storage server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Unique server name
    pub name: String,
    /// Network host, used as the throttle registration key
    pub host: String,
    /// Tier this server belongs to
    pub tier: String,
    /// Total capacity in bytes
    pub max_size: u64,
}

/// A server plus its live load state and command channel.
///
/// The snapshot builder mutates size and the served-segment set as heartbeats
/// arrive; the reconciliation engine only reads and reorders holders. Shared
/// as `Arc<ServerHolder>` between the tier registry and in-flight callbacks.
pub struct ServerHolder {
    server: Arc<ServerInfo>,
    curr_size: AtomicU64,
    served: Mutex<HashSet<String>>,
    peon: Arc<dyn LoadQueuePeon>,
}

impl ServerHolder {
    pub fn new(server: ServerInfo, peon: Arc<dyn LoadQueuePeon>) -> Self {
        Self {
            server: Arc::new(server),
            curr_size: AtomicU64::new(0),
            served: Mutex::new(HashSet::new()),
            peon,
        }
    }

    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    pub fn peon(&self) -> &Arc<dyn LoadQueuePeon> {
        &self.peon
    }

    /// Bytes currently used on this server
    pub fn curr_size(&self) -> u64 {
        self.curr_size.load(Ordering::SeqCst)
    }

    /// Spare capacity, net of bytes already queued for loading
    pub fn available_size(&self) -> u64 {
        self.server
            .max_size
            .saturating_sub(self.curr_size() + self.peon.queued_size())
    }

    /// Is this server currently serving `segment`?
    pub fn is_serving_segment(&self, segment: &Segment) -> bool {
        self.served.lock().unwrap().contains(segment.identifier())
    }

    // === Snapshot-builder mutators ===

    pub fn set_curr_size(&self, size: u64) {
        self.curr_size.store(size, Ordering::SeqCst);
    }

    pub fn add_segment(&self, segment: &Segment) {
        self.served
            .lock()
            .unwrap()
            .insert(segment.identifier().to_string());
        self.curr_size.fetch_add(segment.size, Ordering::SeqCst);
    }

    pub fn remove_segment(&self, segment: &Segment) {
        if self.served.lock().unwrap().remove(segment.identifier()) {
            self.curr_size.fetch_sub(segment.size, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for ServerHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHolder")
            .field("server", &self.server.name)
            .field("tier", &self.server.tier)
            .field("curr_size", &self.curr_size())
            .field("available_size", &self.available_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SegmentInterval;
    use crate::coordinator::peon::PeonCallback;
    use chrono::{TimeZone, Utc};

    struct NoopPeon;

    impl LoadQueuePeon for NoopPeon {
        fn load_segment(&self, _segment: &Segment, on_complete: PeonCallback) {
            on_complete();
        }
        fn drop_segment(&self, _segment: &Segment, on_complete: PeonCallback) {
            on_complete();
        }
        fn queued_size(&self) -> u64 {
            0
        }
        fn is_loading_segment(&self, _segment: &Segment) -> bool {
            false
        }
    }

    fn segment(id: &str, size: u64) -> Segment {
        Segment::new(
            id,
            "events",
            SegmentInterval::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            ),
            "v1",
            size,
        )
    }

    fn holder(name: &str, max_size: u64) -> ServerHolder {
        ServerHolder::new(
            ServerInfo {
                name: name.to_string(),
                host: format!("{}:8083", name),
                tier: "hot".to_string(),
                max_size,
            },
            Arc::new(NoopPeon),
        )
    }

    #[test]
    fn test_available_size() {
        let h = holder("srv-1", 1000);
        assert_eq!(h.available_size(), 1000);

        h.add_segment(&segment("seg-1", 300));
        assert_eq!(h.curr_size(), 300);
        assert_eq!(h.available_size(), 700);
    }

    #[test]
    fn test_serving_membership() {
        let h = holder("srv-1", 1000);
        let seg = segment("seg-1", 100);

        assert!(!h.is_serving_segment(&seg));
        h.add_segment(&seg);
        assert!(h.is_serving_segment(&seg));

        h.remove_segment(&seg);
        assert!(!h.is_serving_segment(&seg));
        assert_eq!(h.curr_size(), 0);
    }

    #[test]
    fn test_remove_unknown_segment_is_noop() {
        let h = holder("srv-1", 1000);
        h.add_segment(&segment("seg-1", 100));
        h.remove_segment(&segment("seg-2", 50));
        assert_eq!(h.curr_size(), 100);
    }
}
