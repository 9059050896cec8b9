//! # minicoord
//!
//! Replica reconciliation engine for a tiered, segment-based column store:
//! given a declarative rule ("keep N replicas of segment S in tier T"), it
//! computes the gap between desired and actual placement and dispatches the
//! minimal set of load/drop commands to close it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        Coordinator run-loop (external)       │
//! │  snapshot builder, rule matching, telemetry  │
//! └──────────────────┬───────────────────────────┘
//!                    │ run(segment, params) per cycle
//! ┌──────────────────▼───────────────────────────┐
//! │   LoadRule: assign phase, then drop phase    │
//! │   ReplicationThrottler │ TieredCluster       │
//! │   BalancerStrategy     │ CoordinatorStats    │
//! └─────────┬──────────────────────┬─────────────┘
//!           │ load/drop (fire-and-forget)
//! ┌─────────▼──────┐   ┌───────────▼────┐
//! │ Peon: server 1 │   │ Peon: server 2 │  ... completion callbacks
//! └────────────────┘   └────────────────┘      release throttle slots
//! ```
//!
//! The engine itself is synchronous and never performs blocking I/O. Actual
//! segment commands travel over per-server peon channels and report back via
//! one-shot completion callbacks, which may race each other on other threads.

pub mod common;
pub mod coordinator;

// Re-export commonly used types
pub use common::{CoordinatorConfig, Error, Result, Segment, SegmentInterval};
pub use coordinator::{
    CoordinatorStats, LoadRule, ReplicationThrottler, RuntimeParams, ServerHolder, ServerInfo,
    TieredCluster,
};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
