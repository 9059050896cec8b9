//! Runtime parameters handed to each rule evaluation

use crate::coordinator::balancer::BalancerStrategyFactory;
use crate::coordinator::cluster::TieredCluster;
use crate::coordinator::lookup::ReplicantLookup;
use crate::coordinator::throttle::ReplicationThrottler;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Everything a rule needs for one reconciliation call, assembled fresh per
/// cycle by the coordinator run-loop.
pub struct RuntimeParams {
    pub cluster: Arc<TieredCluster>,
    pub throttler: Arc<ReplicationThrottler>,
    pub lookup: Arc<dyn ReplicantLookup>,
    pub strategy_factory: Arc<dyn BalancerStrategyFactory>,
    /// Identifiers of segments eligible for proactive assignment
    pub available_segments: HashSet<String>,
    /// Has the deletion debounce elapsed for this cycle?
    pub deletion_wait_elapsed: bool,
    /// Timestamp handed to the strategy factory
    pub balancer_reference_timestamp: DateTime<Utc>,
}

impl RuntimeParams {
    pub fn builder() -> RuntimeParamsBuilder {
        RuntimeParamsBuilder::default()
    }

    /// Is `segment_id` eligible for proactive assignment?
    pub fn is_available(&self, segment_id: &str) -> bool {
        self.available_segments.contains(segment_id)
    }
}

#[derive(Default)]
pub struct RuntimeParamsBuilder {
    cluster: Option<Arc<TieredCluster>>,
    throttler: Option<Arc<ReplicationThrottler>>,
    lookup: Option<Arc<dyn ReplicantLookup>>,
    strategy_factory: Option<Arc<dyn BalancerStrategyFactory>>,
    available_segments: HashSet<String>,
    deletion_wait_elapsed: bool,
    balancer_reference_timestamp: Option<DateTime<Utc>>,
}

impl RuntimeParamsBuilder {
    pub fn cluster(mut self, cluster: Arc<TieredCluster>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn throttler(mut self, throttler: Arc<ReplicationThrottler>) -> Self {
        self.throttler = Some(throttler);
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn ReplicantLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn strategy_factory(mut self, factory: Arc<dyn BalancerStrategyFactory>) -> Self {
        self.strategy_factory = Some(factory);
        self
    }

    pub fn available_segment(mut self, segment_id: impl Into<String>) -> Self {
        self.available_segments.insert(segment_id.into());
        self
    }

    pub fn available_segments(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.available_segments.extend(ids);
        self
    }

    pub fn deletion_wait_elapsed(mut self, elapsed: bool) -> Self {
        self.deletion_wait_elapsed = elapsed;
        self
    }

    pub fn balancer_reference_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.balancer_reference_timestamp = Some(ts);
        self
    }

    /// Panics when a required collaborator is missing; params are assembled
    /// by the coordinator run-loop where that is a programming error.
    pub fn build(self) -> RuntimeParams {
        RuntimeParams {
            cluster: self.cluster.expect("cluster is required"),
            throttler: self.throttler.expect("throttler is required"),
            lookup: self.lookup.expect("lookup is required"),
            strategy_factory: self.strategy_factory.expect("strategy_factory is required"),
            available_segments: self.available_segments,
            deletion_wait_elapsed: self.deletion_wait_elapsed,
            balancer_reference_timestamp: self
                .balancer_reference_timestamp
                .unwrap_or_else(Utc::now),
        }
    }
}
