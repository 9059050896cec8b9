//! Placement strategy for new replicas

use crate::common::Segment;
use crate::coordinator::holder::ServerHolder;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Picks the target server for a new replica.
///
/// Implementations must return a holder from `candidates` with spare capacity
/// for the segment and should avoid servers already serving the same segment.
/// `None` means no eligible server exists right now.
pub trait BalancerStrategy {
    fn find_new_segment_home(
        &self,
        segment: &Segment,
        candidates: &[Arc<ServerHolder>],
    ) -> Option<Arc<ServerHolder>>;
}

/// Builds a strategy instance for one reconciliation cycle.
pub trait BalancerStrategyFactory: Send + Sync {
    fn create(&self, reference_timestamp: DateTime<Utc>) -> Box<dyn BalancerStrategy>;
}

/// Default strategy: among eligible candidates, pick the one with the most
/// available capacity. Candidates are shuffled first so equal-capacity ties
/// don't always resolve to the same server.
pub struct MostAvailableStrategy {
    reference_timestamp: DateTime<Utc>,
}

impl MostAvailableStrategy {
    pub fn new(reference_timestamp: DateTime<Utc>) -> Self {
        Self {
            reference_timestamp,
        }
    }
}

impl BalancerStrategy for MostAvailableStrategy {
    fn find_new_segment_home(
        &self,
        segment: &Segment,
        candidates: &[Arc<ServerHolder>],
    ) -> Option<Arc<ServerHolder>> {
        let mut eligible: Vec<&Arc<ServerHolder>> = candidates
            .iter()
            .filter(|h| !h.is_serving_segment(segment))
            .filter(|h| !h.peon().is_loading_segment(segment))
            .filter(|h| h.available_size() >= segment.size)
            .collect();

        eligible.shuffle(&mut rand::thread_rng());

        let chosen = eligible
            .into_iter()
            .max_by_key(|h| h.available_size())
            .cloned();

        if let Some(ref holder) = chosen {
            tracing::debug!(
                "Placing segment {} on {} (available {} bytes, reference {})",
                segment.identifier(),
                holder.server().name,
                holder.available_size(),
                self.reference_timestamp
            );
        }

        chosen
    }
}

/// Stock factory producing [`MostAvailableStrategy`] instances
#[derive(Default)]
pub struct MostAvailableStrategyFactory;

impl BalancerStrategyFactory for MostAvailableStrategyFactory {
    fn create(&self, reference_timestamp: DateTime<Utc>) -> Box<dyn BalancerStrategy> {
        Box::new(MostAvailableStrategy::new(reference_timestamp))
    }
}
