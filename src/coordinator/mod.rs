//! Replica reconciliation engine
//!
//! The coordinator run-loop evaluates one load rule per (segment, rule) pair
//! each cycle:
//! - [`rules::LoadRule::run`] computes desired-vs-actual placement and
//!   dispatches assign/drop commands
//! - [`throttle::ReplicationThrottler`] bounds in-flight operations per tier
//! - [`cluster::TieredCluster`] orders servers by load for target selection
//! - [`peon::LoadQueuePeon`] carries the async commands and reports
//!   completion back through one-shot callbacks

pub mod balancer;
pub mod cluster;
pub mod holder;
pub mod lookup;
pub mod params;
pub mod peon;
pub mod rules;
pub mod stats;
pub mod throttle;

pub use balancer::{BalancerStrategy, BalancerStrategyFactory, MostAvailableStrategyFactory};
pub use cluster::{TierRegistry, TieredCluster};
pub use holder::{ServerHolder, ServerInfo};
pub use lookup::{ReplicantLookup, TableReplicantLookup};
pub use params::RuntimeParams;
pub use peon::{ChannelPeon, LoadQueuePeon, PeonCallback, SegmentCommandKind, SegmentCommandSink};
pub use rules::LoadRule;
pub use stats::{CoordinatorStats, STAT_ASSIGNED, STAT_DROPPED};
pub use throttle::ReplicationThrottler;
