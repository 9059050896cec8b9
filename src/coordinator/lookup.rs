//! Replica-count lookup
//!
//! Counts are derived from a point-in-time cluster snapshot by an external
//! builder; the reconciliation engine treats them as read-only for the
//! duration of one call.

use std::collections::HashMap;

/// Read-only view of how many replicas of a segment exist where.
pub trait ReplicantLookup: Send + Sync {
    /// Replicas of `segment_id` present or in-flight in `tier`
    fn total_replicants(&self, segment_id: &str, tier: &str) -> usize;

    /// Loaded replicas of `segment_id` counted cluster-wide for `tier`'s rule
    fn cluster_replicants(&self, segment_id: &str, tier: &str) -> usize;

    /// Loaded replica counts of `segment_id` per tier
    fn per_tier_replicants(&self, segment_id: &str) -> HashMap<String, usize>;
}

/// Table-backed lookup, filled in by the snapshot builder.
#[derive(Debug, Default)]
pub struct TableReplicantLookup {
    total: HashMap<(String, String), usize>,
    cluster: HashMap<(String, String), usize>,
    per_tier: HashMap<String, HashMap<String, usize>>,
}

impl TableReplicantLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&mut self, segment_id: &str, tier: &str, count: usize) {
        self.total
            .insert((segment_id.to_string(), tier.to_string()), count);
    }

    pub fn set_cluster(&mut self, segment_id: &str, tier: &str, count: usize) {
        self.cluster
            .insert((segment_id.to_string(), tier.to_string()), count);
    }

    pub fn set_tier_count(&mut self, segment_id: &str, tier: &str, count: usize) {
        self.per_tier
            .entry(segment_id.to_string())
            .or_default()
            .insert(tier.to_string(), count);
    }
}

impl ReplicantLookup for TableReplicantLookup {
    fn total_replicants(&self, segment_id: &str, tier: &str) -> usize {
        self.total
            .get(&(segment_id.to_string(), tier.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn cluster_replicants(&self, segment_id: &str, tier: &str) -> usize {
        self.cluster
            .get(&(segment_id.to_string(), tier.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn per_tier_replicants(&self, segment_id: &str) -> HashMap<String, usize> {
        self.per_tier.get(segment_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_defaults_to_zero() {
        let lookup = TableReplicantLookup::new();
        assert_eq!(lookup.total_replicants("seg-1", "hot"), 0);
        assert_eq!(lookup.cluster_replicants("seg-1", "hot"), 0);
        assert!(lookup.per_tier_replicants("seg-1").is_empty());
    }

    #[test]
    fn test_table_lookup_reads_back() {
        let mut lookup = TableReplicantLookup::new();
        lookup.set_total("seg-1", "hot", 2);
        lookup.set_cluster("seg-1", "hot", 3);
        lookup.set_tier_count("seg-1", "hot", 2);
        lookup.set_tier_count("seg-1", "cold", 1);

        assert_eq!(lookup.total_replicants("seg-1", "hot"), 2);
        assert_eq!(lookup.cluster_replicants("seg-1", "hot"), 3);

        let per_tier = lookup.per_tier_replicants("seg-1");
        assert_eq!(per_tier.get("hot"), Some(&2));
        assert_eq!(per_tier.get("cold"), Some(&1));
    }
}
