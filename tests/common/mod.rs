//! Shared fixtures for reconciliation tests

use chrono::{TimeZone, Utc};
use minicoord::coordinator::peon::{LoadQueuePeon, PeonCallback, SegmentCommandKind};
use minicoord::{Segment, SegmentInterval, ServerHolder, ServerInfo};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Install the tracing subscriber once per test binary
pub fn init_logging() {
    INIT.call_once(|| minicoord::common::init_tracing("debug"));
}

/// Peon that records dispatched commands and lets tests fire completion
/// callbacks manually, including firing them more than once.
#[derive(Default)]
pub struct RecordingPeon {
    commands: Mutex<Vec<RecordedCommand>>,
}

pub struct RecordedCommand {
    pub kind: SegmentCommandKind,
    pub segment: Segment,
    on_complete: Option<PeonCallback>,
}

impl RecordingPeon {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// (kind, segment id) of every dispatched command, in dispatch order
    pub fn dispatched(&self) -> Vec<(SegmentCommandKind, String)> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.kind, c.segment.identifier().to_string()))
            .collect()
    }

    pub fn load_count(&self) -> usize {
        self.dispatched()
            .iter()
            .filter(|(k, _)| *k == SegmentCommandKind::Load)
            .count()
    }

    pub fn drop_count(&self) -> usize {
        self.dispatched()
            .iter()
            .filter(|(k, _)| *k == SegmentCommandKind::Drop)
            .count()
    }

    /// Fire every pending completion callback once
    pub fn complete_all(&self) {
        let callbacks: Vec<PeonCallback> = self
            .commands
            .lock()
            .unwrap()
            .iter_mut()
            .filter_map(|c| c.on_complete.take())
            .collect();
        for cb in callbacks {
            cb();
        }
    }
}

impl LoadQueuePeon for RecordingPeon {
    fn load_segment(&self, segment: &Segment, on_complete: PeonCallback) {
        self.commands.lock().unwrap().push(RecordedCommand {
            kind: SegmentCommandKind::Load,
            segment: segment.clone(),
            on_complete: Some(on_complete),
        });
    }

    fn drop_segment(&self, segment: &Segment, on_complete: PeonCallback) {
        self.commands.lock().unwrap().push(RecordedCommand {
            kind: SegmentCommandKind::Drop,
            segment: segment.clone(),
            on_complete: Some(on_complete),
        });
    }

    fn queued_size(&self) -> u64 {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == SegmentCommandKind::Load && c.on_complete.is_some())
            .map(|c| c.segment.size)
            .sum()
    }

    fn is_loading_segment(&self, segment: &Segment) -> bool {
        self.commands.lock().unwrap().iter().any(|c| {
            c.kind == SegmentCommandKind::Load
                && c.on_complete.is_some()
                && c.segment.identifier() == segment.identifier()
        })
    }
}

pub fn segment(id: &str, size: u64) -> Segment {
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

/// Build a holder with its own recording peon
pub fn holder(
    name: &str,
    tier: &str,
    max_size: u64,
    used: u64,
) -> (Arc<ServerHolder>, Arc<RecordingPeon>) {
    let peon = RecordingPeon::new();
    let h = ServerHolder::new(
        ServerInfo {
            name: name.to_string(),
            host: format!("{}:8083", name),
            tier: tier.to_string(),
            max_size,
        },
        peon.clone(),
    );
    h.set_curr_size(used);
    (Arc::new(h), peon)
}

/// Total load dispatches across a fleet of recording peons
pub fn total_loads(peons: &[Arc<RecordingPeon>]) -> usize {
    peons.iter().map(|p| p.load_count()).sum()
}

/// Total drop dispatches across a fleet of recording peons
pub fn total_drops(peons: &[Arc<RecordingPeon>]) -> usize {
    peons.iter().map(|p| p.drop_count()).sum()
}
