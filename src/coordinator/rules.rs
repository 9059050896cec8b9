//! Load rules and the assign/drop reconciliation they drive
//!
//! A load rule states how many replicas of a segment a tier should hold.
//! [`LoadRule::run`] computes the gap between desired and actual placement
//! for one (segment, rule) pair and dispatches the minimal set of load/drop
//! commands to close it, under throttle backpressure. It never returns an
//! error: configuration problems are alerted, capacity pressure is deferred
//! to the next cycle, and the caller always gets a stats accumulator back.

use crate::common::{Segment, SegmentInterval};
use crate::coordinator::balancer::BalancerStrategy;
use crate::coordinator::holder::ServerHolder;
use crate::coordinator::params::RuntimeParams;
use crate::coordinator::peon::PeonCallback;
use crate::coordinator::stats::{CoordinatorStats, STAT_ASSIGNED, STAT_DROPPED};
use crate::coordinator::throttle::ReplicationThrottler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replication policy for one tier.
///
/// Variants differ only in the rule-matching metadata they carry; the
/// reconciliation algorithm is written once against the shared accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoadRule {
    /// Keep `replicants` copies in `tier` for all time
    #[serde(rename = "loadForever")]
    Forever { tier: String, replicants: usize },

    /// Keep `replicants` copies in `tier` for segments in a fixed interval
    #[serde(rename = "loadByInterval")]
    Interval {
        tier: String,
        replicants: usize,
        interval: SegmentInterval,
    },

    /// Keep `replicants` copies in `tier` for segments within a trailing
    /// period of now (e.g. "7d")
    #[serde(rename = "loadByPeriod")]
    Period {
        tier: String,
        replicants: usize,
        period: String,
    },
}

impl LoadRule {
    /// Tier this rule instance governs
    pub fn tier(&self) -> &str {
        match self {
            LoadRule::Forever { tier, .. }
            | LoadRule::Interval { tier, .. }
            | LoadRule::Period { tier, .. } => tier,
        }
    }

    /// Desired replica count in this rule's own tier
    pub fn replicants(&self) -> usize {
        match self {
            LoadRule::Forever { replicants, .. }
            | LoadRule::Interval { replicants, .. }
            | LoadRule::Period { replicants, .. } => *replicants,
        }
    }

    /// Desired replica count for an arbitrary tier. Zero for tiers other
    /// than the rule's own, which is what drives other-tier cleanup in the
    /// drop phase.
    pub fn replicants_for(&self, tier: &str) -> usize {
        if tier == self.tier() {
            self.replicants()
        } else {
            0
        }
    }

    /// Trailing window of a period rule, `None` for other variants
    pub fn period(&self) -> crate::Result<Option<std::time::Duration>> {
        match self {
            LoadRule::Period { period, .. } => crate::common::parse_duration(period).map(Some),
            _ => Ok(None),
        }
    }

    /// Parse a rule from its stored JSON representation
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this rule to its stored JSON representation
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reconcile one segment against this rule: run the assign phase (when
    /// the segment is available), then the drop phase, and report what was
    /// dispatched.
    pub fn run(&self, segment: &Segment, params: &RuntimeParams) -> CoordinatorStats {
        let mut stats = CoordinatorStats::new();

        let expected = self.replicants();
        let total = params
            .lookup
            .total_replicants(segment.identifier(), self.tier());
        let cluster_replicants = params
            .lookup
            .cluster_replicants(segment.identifier(), self.tier());

        let candidates = match params.cluster.servers_by_tier(self.tier()) {
            Some(candidates) => candidates,
            None => {
                tracing::error!(
                    "Tier {} has no servers! Check your cluster configuration!",
                    self.tier()
                );
                return stats;
            }
        };

        let strategy = params
            .strategy_factory
            .create(params.balancer_reference_timestamp);

        if params.is_available(segment.identifier()) {
            stats.accumulate(&self.assign(
                &params.throttler,
                expected,
                total,
                strategy.as_ref(),
                &candidates,
                segment,
            ));
        }

        stats.accumulate(&self.drop_excess(expected, cluster_replicants, segment, params));

        stats
    }

    /// Assign phase: place replicas until `expected` is reached or the loop
    /// is blocked by throttle denial or lack of eligible servers.
    fn assign(
        &self,
        throttler: &Arc<ReplicationThrottler>,
        expected: usize,
        mut total: usize,
        strategy: &dyn BalancerStrategy,
        candidates: &[Arc<ServerHolder>],
        segment: &Segment,
    ) -> CoordinatorStats {
        let mut stats = CoordinatorStats::new();

        while total < expected {
            // The first copy of a segment is never throttle-limited, so at
            // least one replica can always be placed
            let replicate = total > 0;

            if replicate && !throttler.can_create_replicant(self.tier()) {
                tracing::debug!(
                    "Creation throttle full for tier {}, deferring remaining {} replicas of {}",
                    self.tier(),
                    expected - total,
                    segment.identifier()
                );
                break;
            }

            let holder = match strategy.find_new_segment_home(segment, candidates) {
                Some(holder) => holder,
                None => {
                    tracing::warn!(
                        "Not enough {} servers or node capacity to assign segment {}! Expected replicants: {}",
                        self.tier(),
                        segment.identifier(),
                        expected
                    );
                    break;
                }
            };

            let on_complete: PeonCallback = if replicate {
                throttler.register_replicant_creation(
                    self.tier(),
                    segment.identifier(),
                    &holder.server().host,
                );
                release_creation_slot(throttler, self.tier(), segment, &holder)
            } else {
                Box::new(|| {})
            };

            holder.peon().load_segment(segment, on_complete);

            stats.add_to_tiered_stat(STAT_ASSIGNED, self.tier(), 1);
            total += 1;
        }

        stats
    }

    /// Drop phase: per tier holding replicas, remove the excess above this
    /// rule's desired count, scanning most-loaded servers first.
    fn drop_excess(
        &self,
        expected: usize,
        cluster_replicants: usize,
        segment: &Segment,
        params: &RuntimeParams,
    ) -> CoordinatorStats {
        let mut stats = CoordinatorStats::new();

        if !params.deletion_wait_elapsed {
            return stats;
        }

        // Never drop while the cluster is still catching up on assignment
        if cluster_replicants < expected {
            return stats;
        }

        let replicants_by_tier = params.lookup.per_tier_replicants(segment.identifier());

        for (tier, actual) in replicants_by_tier {
            let mut actual = actual;
            let tier_expected = self.replicants_for(&tier);

            if !params.cluster.has_tier(&tier) {
                tracing::error!("No holders found for tier {}", tier);
                return stats;
            }

            let mut inspected: Vec<Arc<ServerHolder>> = Vec::new();
            while actual > tier_expected {
                let holder = match params.cluster.pop_most_loaded(&tier) {
                    Some(holder) => holder,
                    None => {
                        tracing::warn!(
                            "Tier {} claims {} replicas of segment {} but no servers are enumerable",
                            tier,
                            actual,
                            segment.identifier()
                        );
                        break;
                    }
                };

                if holder.is_serving_segment(segment) {
                    // Only trimming excess replicas is throttled; removing the
                    // segment from a tier entirely always proceeds
                    let trimming = tier_expected > 0;
                    if trimming {
                        if !params.throttler.can_destroy_replicant(&tier) {
                            params.cluster.reinsert(&tier, vec![holder]);
                            break;
                        }
                        params.throttler.register_replicant_termination(
                            &tier,
                            segment.identifier(),
                            &holder.server().host,
                        );
                    }

                    let on_complete: PeonCallback = if trimming {
                        release_termination_slot(&params.throttler, &tier, segment, &holder)
                    } else {
                        Box::new(|| {})
                    };

                    holder.peon().drop_segment(segment, on_complete);

                    actual -= 1;
                    stats.add_to_tiered_stat(STAT_DROPPED, &tier, 1);
                }

                // Popped holders go back at the end whether or not they were
                // chosen; losing one would shrink the tier silently
                inspected.push(holder);
            }

            params.cluster.reinsert(&tier, inspected);
        }

        stats
    }
}

fn release_creation_slot(
    throttler: &Arc<ReplicationThrottler>,
    tier: &str,
    segment: &Segment,
    holder: &Arc<ServerHolder>,
) -> PeonCallback {
    let throttler = throttler.clone();
    let tier = tier.to_string();
    let segment_id = segment.identifier().to_string();
    let host = holder.server().host.clone();
    Box::new(move || {
        throttler.unregister_replicant_creation(&tier, &segment_id, &host);
    })
}

fn release_termination_slot(
    throttler: &Arc<ReplicationThrottler>,
    tier: &str,
    segment: &Segment,
    holder: &Arc<ServerHolder>,
) -> PeonCallback {
    let throttler = throttler.clone();
    let tier = tier.to_string();
    let segment_id = segment.identifier().to_string();
    let host = holder.server().host.clone();
    Box::new(move || {
        throttler.unregister_replicant_termination(&tier, &segment_id, &host);
    })
}
