//! Per-tier admission control for in-flight replica operations
//!
//! Registration happens on the reconciling thread before dispatch;
//! unregistration happens from completion callbacks on whatever thread the
//! command channel completes on. Both sides key in-flight operations by
//! (segment, server) so duplicate callback invocations cannot drive a count
//! negative.

use crate::common::CoordinatorConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type InFlight = HashMap<String, HashSet<(String, String)>>;

#[derive(Debug, Default)]
struct ThrottleSide {
    in_flight: Mutex<InFlight>,
}

impl ThrottleSide {
    fn count(&self, tier: &str) -> usize {
        self.in_flight
            .lock()
            .unwrap()
            .get(tier)
            .map_or(0, |set| set.len())
    }

    fn register(&self, direction: &str, tier: &str, segment_id: &str, server: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let inserted = in_flight
            .entry(tier.to_string())
            .or_default()
            .insert((segment_id.to_string(), server.to_string()));
        if !inserted {
            tracing::warn!(
                "Duplicate {} registration for segment {} on {} in tier {}, ignoring",
                direction,
                segment_id,
                server,
                tier
            );
        }
    }

    fn unregister(&self, direction: &str, tier: &str, segment_id: &str, server: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let removed = in_flight
            .get_mut(tier)
            .map_or(false, |set| set.remove(&(segment_id.to_string(), server.to_string())));
        if !removed {
            tracing::warn!(
                "Unregistration of {} for segment {} on {} in tier {} without a matching registration",
                direction,
                segment_id,
                server,
                tier
            );
        }
    }

    fn clear(&self) {
        self.in_flight.lock().unwrap().clear();
    }
}

/// Bounds the number of concurrently in-flight replica creations and
/// destructions per tier. Explicitly constructed and dependency-injected;
/// [`ReplicationThrottler::reset`] clears both sides on leadership handoff.
pub struct ReplicationThrottler {
    config: CoordinatorConfig,
    creation: ThrottleSide,
    termination: ThrottleSide,
}

impl ReplicationThrottler {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            creation: ThrottleSide::default(),
            termination: ThrottleSide::default(),
        }
    }

    /// May another replica creation be dispatched for `tier`?
    pub fn can_create_replicant(&self, tier: &str) -> bool {
        self.creation.count(tier) < self.config.creation_limit(tier)
    }

    /// May another replica destruction be dispatched for `tier`?
    pub fn can_destroy_replicant(&self, tier: &str) -> bool {
        self.termination.count(tier) < self.config.destruction_limit(tier)
    }

    /// Record a creation as in-flight; call before dispatching the load
    pub fn register_replicant_creation(&self, tier: &str, segment_id: &str, server: &str) {
        self.creation.register("creation", tier, segment_id, server);
    }

    /// Release a creation slot; called from the load completion callback
    pub fn unregister_replicant_creation(&self, tier: &str, segment_id: &str, server: &str) {
        self.creation.unregister("creation", tier, segment_id, server);
    }

    /// Record a destruction as in-flight; call before dispatching the drop
    pub fn register_replicant_termination(&self, tier: &str, segment_id: &str, server: &str) {
        self.termination
            .register("termination", tier, segment_id, server);
    }

    /// Release a destruction slot; called from the drop completion callback
    pub fn unregister_replicant_termination(&self, tier: &str, segment_id: &str, server: &str) {
        self.termination
            .unregister("termination", tier, segment_id, server);
    }

    /// In-flight creation count for `tier` (telemetry)
    pub fn in_flight_creations(&self, tier: &str) -> usize {
        self.creation.count(tier)
    }

    /// In-flight destruction count for `tier` (telemetry)
    pub fn in_flight_terminations(&self, tier: &str) -> usize {
        self.termination.count(tier)
    }

    /// Forget all in-flight state. Used when this coordinator gains or loses
    /// leadership: stale slots from a previous term must not throttle the new
    /// term's work.
    pub fn reset(&self) {
        self.creation.clear();
        self.termination.clear();
    }
}
