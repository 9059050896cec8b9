//! Tiered server registry
//!
//! Each tier keeps a bounded, load-ordered collection of server holders. The
//! assign phase reads a full-membership snapshot as its candidate list; the
//! drop phase pops most-loaded holders from the tail, inspects them, and
//! reinserts everything it popped so membership is conserved.

use crate::coordinator::holder::ServerHolder;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bounded, load-ordered multiset of server holders for one tier.
///
/// Kept sorted by descending available size: least-loaded holders at the
/// front, most-loaded at the tail. Overflow evicts from the tail so the
/// holders most useful for assignment survive.
#[derive(Debug)]
pub struct TierRegistry {
    holders: Vec<Arc<ServerHolder>>,
    capacity: usize,
}

impl TierRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            holders: Vec::new(),
            capacity,
        }
    }

    fn sort(&mut self) {
        self.holders
            .sort_by(|a, b| b.available_size().cmp(&a.available_size()));
    }

    /// Insert a holder, evicting the most-loaded one on overflow
    pub fn insert(&mut self, holder: Arc<ServerHolder>) {
        self.holders.push(holder);
        self.sort();
        if self.holders.len() > self.capacity {
            let evicted = self.holders.pop();
            if let Some(h) = evicted {
                tracing::warn!(
                    "Tier registry over capacity ({}), evicting most-loaded server {}",
                    self.capacity,
                    h.server().name
                );
            }
        }
    }

    /// Bulk reinsertion, used to restore holders popped during a drop scan
    pub fn extend(&mut self, holders: impl IntoIterator<Item = Arc<ServerHolder>>) {
        for holder in holders {
            self.insert(holder);
        }
    }

    /// Pop the most-loaded holder (smallest available size)
    pub fn pop_most_loaded(&mut self) -> Option<Arc<ServerHolder>> {
        self.sort();
        self.holders.pop()
    }

    /// Full-membership snapshot, least-loaded first
    pub fn holders(&self) -> Vec<Arc<ServerHolder>> {
        self.holders.clone()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// All tier registries of the cluster, keyed by tier name.
///
/// Reads from concurrent rule evaluations are safe; the coordinator
/// serializes drop-phase mutation per tier by running one reconciliation
/// cycle at a time.
pub struct TieredCluster {
    tiers: Mutex<HashMap<String, TierRegistry>>,
    registry_capacity: usize,
}

impl TieredCluster {
    pub fn new(registry_capacity: usize) -> Self {
        Self {
            tiers: Mutex::new(HashMap::new()),
            registry_capacity,
        }
    }

    /// Register a server in its tier, creating the tier registry on first use
    pub fn add_server(&self, holder: Arc<ServerHolder>) {
        let tier = holder.server().tier.clone();
        let mut tiers = self.tiers.lock().unwrap();
        tiers
            .entry(tier)
            .or_insert_with(|| TierRegistry::with_capacity(self.registry_capacity))
            .insert(holder);
    }

    /// Snapshot of a tier's membership, least-loaded first.
    /// `None` when the tier has no registry at all.
    pub fn servers_by_tier(&self, tier: &str) -> Option<Vec<Arc<ServerHolder>>> {
        self.tiers.lock().unwrap().get(tier).map(|r| r.holders())
    }

    pub fn has_tier(&self, tier: &str) -> bool {
        self.tiers.lock().unwrap().contains_key(tier)
    }

    /// Pop the most-loaded holder of `tier`; `None` when the tier is missing
    /// or empty
    pub fn pop_most_loaded(&self, tier: &str) -> Option<Arc<ServerHolder>> {
        self.tiers
            .lock()
            .unwrap()
            .get_mut(tier)
            .and_then(|r| r.pop_most_loaded())
    }

    /// Return previously popped holders to `tier`
    pub fn reinsert(&self, tier: &str, holders: Vec<Arc<ServerHolder>>) {
        if holders.is_empty() {
            return;
        }
        let mut tiers = self.tiers.lock().unwrap();
        match tiers.get_mut(tier) {
            Some(registry) => registry.extend(holders),
            None => tracing::error!(
                "Cannot reinsert {} holders, tier {} vanished from the cluster",
                holders.len(),
                tier
            ),
        }
    }

    pub fn tier_len(&self, tier: &str) -> usize {
        self.tiers.lock().unwrap().get(tier).map_or(0, |r| r.len())
    }

    /// All tier names with a registry
    pub fn tiers(&self) -> Vec<String> {
        self.tiers.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Segment;
    use crate::coordinator::holder::ServerInfo;
    use crate::coordinator::peon::{LoadQueuePeon, PeonCallback};

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

    fn holder(name: &str, tier: &str, max_size: u64, used: u64) -> Arc<ServerHolder> {
        let h = ServerHolder::new(
            ServerInfo {
                name: name.to_string(),
                host: format!("{}:8083", name),
                tier: tier.to_string(),
                max_size,
            },
            Arc::new(NoopPeon),
        );
        h.set_curr_size(used);
        Arc::new(h)
    }

    #[test]
    fn test_registry_ordering() {
        let mut registry = TierRegistry::with_capacity(16);
        registry.insert(holder("a", "hot", 1000, 100));
        registry.insert(holder("b", "hot", 1000, 900));
        registry.insert(holder("c", "hot", 1000, 500));

        // Most loaded popped first
        assert_eq!(registry.pop_most_loaded().unwrap().server().name, "b");
        assert_eq!(registry.pop_most_loaded().unwrap().server().name, "c");
        assert_eq!(registry.pop_most_loaded().unwrap().server().name, "a");
        assert!(registry.pop_most_loaded().is_none());
    }

    #[test]
    fn test_registry_snapshot_least_loaded_first() {
        let mut registry = TierRegistry::with_capacity(16);
        registry.insert(holder("a", "hot", 1000, 900));
        registry.insert(holder("b", "hot", 1000, 100));

        let snapshot = registry.holders();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].server().name, "b");
        // Snapshot does not consume anything
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_capacity_evicts_most_loaded() {
        let mut registry = TierRegistry::with_capacity(2);
        registry.insert(holder("a", "hot", 1000, 100));
        registry.insert(holder("b", "hot", 1000, 900));
        registry.insert(holder("c", "hot", 1000, 500));

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry
            .holders()
            .iter()
            .map(|h| h.server().name.clone())
            .collect();
        // Lowest-load holders survive for assignment purposes
        assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_pop_and_reinsert_conserves_membership() {
        let cluster = TieredCluster::new(16);
        cluster.add_server(holder("a", "hot", 1000, 100));
        cluster.add_server(holder("b", "hot", 1000, 500));
        cluster.add_server(holder("c", "hot", 1000, 900));

        let mut popped = Vec::new();
        while let Some(h) = cluster.pop_most_loaded("hot") {
            popped.push(h);
        }
        assert_eq!(popped.len(), 3);
        assert_eq!(cluster.tier_len("hot"), 0);

        cluster.reinsert("hot", popped);
        assert_eq!(cluster.tier_len("hot"), 3);
    }

    #[test]
    fn test_missing_tier() {
        let cluster = TieredCluster::new(16);
        cluster.add_server(holder("a", "hot", 1000, 0));

        assert!(cluster.servers_by_tier("cold").is_none());
        assert!(cluster.pop_most_loaded("cold").is_none());
        assert!(!cluster.has_tier("cold"));
        assert!(cluster.has_tier("hot"));
        assert_eq!(cluster.tiers(), vec!["hot".to_string()]);
    }
}
