//! Per-cycle coordinator statistics

use std::collections::HashMap;

/// Metric name for replicas assigned during a cycle
pub const STAT_ASSIGNED: &str = "assignedCount";
/// Metric name for replicas dropped during a cycle
pub const STAT_DROPPED: &str = "droppedCount";

/// Counters keyed by (metric name, tier), merged additively.
///
/// Each reconciliation call builds a fresh accumulator and the caller folds it
/// into its cycle-wide aggregate with [`CoordinatorStats::accumulate`].
#[derive(Debug, Default, Clone)]
pub struct CoordinatorStats {
    tiered: HashMap<String, HashMap<String, i64>>,
}

impl CoordinatorStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to the counter for (`metric`, `tier`)
    pub fn add_to_tiered_stat(&mut self, metric: &str, tier: &str, delta: i64) {
        *self
            .tiered
            .entry(metric.to_string())
            .or_default()
            .entry(tier.to_string())
            .or_insert(0) += delta;
    }

    /// Read the counter for (`metric`, `tier`); 0 when never touched
    pub fn tiered_stat(&self, metric: &str, tier: &str) -> i64 {
        self.tiered
            .get(metric)
            .and_then(|per_tier| per_tier.get(tier))
            .copied()
            .unwrap_or(0)
    }

    /// All tiers that have a counter for `metric`
    pub fn tiers(&self, metric: &str) -> Vec<&str> {
        self.tiered
            .get(metric)
            .map(|per_tier| per_tier.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Additive merge of another accumulator into this one
    pub fn accumulate(&mut self, other: &CoordinatorStats) {
        for (metric, per_tier) in &other.tiered {
            for (tier, count) in per_tier {
                self.add_to_tiered_stat(metric, tier, *count);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiered.is_empty()
    }
}
