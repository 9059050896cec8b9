//! Per-server async command channel (the "peon")
//!
//! The reconciliation engine dispatches fire-and-forget load/drop commands
//! through a [`LoadQueuePeon`] and learns about completion through a one-shot
//! callback. The callback must fire exactly once per dispatched command,
//! whether the remote operation succeeded or failed; the throttler relies on
//! it to release in-flight slots.

use crate::common::Segment;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One-shot completion notification, fired exactly once per dispatched command
pub type PeonCallback = Box<dyn FnOnce() + Send>;

/// Async command channel to a single storage server
pub trait LoadQueuePeon: Send + Sync {
    /// Ask the server to load `segment`; `on_complete` fires when the
    /// operation finishes (success or failure)
    fn load_segment(&self, segment: &Segment, on_complete: PeonCallback);

    /// Ask the server to drop `segment`; `on_complete` fires when the
    /// operation finishes (success or failure)
    fn drop_segment(&self, segment: &Segment, on_complete: PeonCallback);

    /// Bytes queued for loading but not yet completed
    fn queued_size(&self) -> u64;

    /// Is a load of `segment` already queued on this channel?
    fn is_loading_segment(&self, segment: &Segment) -> bool;
}

/// Command kind handed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentCommandKind {
    Load,
    Drop,
}

/// Transport that actually tells a server to load or drop a segment.
///
/// Implementations hand the request to their RPC stack; returning (Ok or Err)
/// counts as completion of the hand-off. The worker task fires the caller's
/// callback in both cases.
pub trait SegmentCommandSink: Send + Sync + 'static {
    fn deliver(&self, server: &str, kind: SegmentCommandKind, segment: &Segment)
        -> crate::Result<()>;
}

struct PeonCommand {
    kind: SegmentCommandKind,
    segment: Segment,
    on_complete: PeonCallback,
}

/// [`LoadQueuePeon`] backed by a tokio mpsc channel and a worker task.
///
/// Exactly-once completion is structural: the callback is an owned `FnOnce`
/// consumed by the worker. Queued byte accounting is decremented before the
/// callback runs so `queued_size` never over-reports after completion.
pub struct ChannelPeon {
    server: String,
    tx: mpsc::UnboundedSender<PeonCommand>,
    queued_bytes: Arc<AtomicU64>,
    loading: Arc<Mutex<HashSet<String>>>,
}

impl ChannelPeon {
    /// Spawn the worker task for `server` and return the peon handle
    pub fn spawn(server: impl Into<String>, sink: Arc<dyn SegmentCommandSink>) -> Arc<Self> {
        let server = server.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<PeonCommand>();
        let queued_bytes = Arc::new(AtomicU64::new(0));
        let loading = Arc::new(Mutex::new(HashSet::new()));

        let worker_server = server.clone();
        let worker_queued = queued_bytes.clone();
        let worker_loading = loading.clone();
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                if let Err(e) = sink.deliver(&worker_server, cmd.kind, &cmd.segment) {
                    tracing::warn!(
                        "Delivery of {:?} for segment {} to {} failed: {}",
                        cmd.kind,
                        cmd.segment.identifier(),
                        worker_server,
                        e
                    );
                }
                if cmd.kind == SegmentCommandKind::Load {
                    worker_queued.fetch_sub(cmd.segment.size, Ordering::SeqCst);
                    worker_loading
                        .lock()
                        .unwrap()
                        .remove(cmd.segment.identifier());
                }
                (cmd.on_complete)();
            }
        });

        Arc::new(Self {
            server,
            tx,
            queued_bytes,
            loading,
        })
    }

    fn enqueue(&self, kind: SegmentCommandKind, segment: &Segment, on_complete: PeonCallback) {
        if kind == SegmentCommandKind::Load {
            self.queued_bytes.fetch_add(segment.size, Ordering::SeqCst);
            self.loading
                .lock()
                .unwrap()
                .insert(segment.identifier().to_string());
        }
        let cmd = PeonCommand {
            kind,
            segment: segment.clone(),
            on_complete,
        };
        if let Err(mpsc::error::SendError(cmd)) = self.tx.send(cmd) {
            // Worker is gone; the command never left this process, so the
            // slot must be released immediately.
            tracing::warn!(
                "Command channel to {} is closed, completing {:?} of {} locally",
                self.server,
                kind,
                cmd.segment.identifier()
            );
            if kind == SegmentCommandKind::Load {
                self.queued_bytes.fetch_sub(cmd.segment.size, Ordering::SeqCst);
                self.loading
                    .lock()
                    .unwrap()
                    .remove(cmd.segment.identifier());
            }
            (cmd.on_complete)();
        }
    }
}

impl LoadQueuePeon for ChannelPeon {
    fn load_segment(&self, segment: &Segment, on_complete: PeonCallback) {
        self.enqueue(SegmentCommandKind::Load, segment, on_complete);
    }

    fn drop_segment(&self, segment: &Segment, on_complete: PeonCallback) {
        self.enqueue(SegmentCommandKind::Drop, segment, on_complete);
    }

    fn queued_size(&self) -> u64 {
        self.queued_bytes.load(Ordering::SeqCst)
    }

    fn is_loading_segment(&self, segment: &Segment) -> bool {
        self.loading.lock().unwrap().contains(segment.identifier())
    }
}
