//! Lock-free counters shared by the engine components of one session.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::MetricsSnapshot;

/// Per-session engine counters.
///
/// All updates use `Relaxed` ordering: the counters are diagnostics and
/// never synchronize other memory.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    invalid_coordinates: AtomicU64,
    invalid_listings: AtomicU64,
    cluster_passes: AtomicU64,
    clusters_emitted: AtomicU64,
    selector_cache_hits: AtomicU64,
    selector_truncations: AtomicU64,
    admitted: AtomicU64,
    evicted_out_of_band: AtomicU64,
    evicted_capacity: AtomicU64,
    admission_ticks: AtomicU64,
    strategy_switches: AtomicU64,
    expansions: AtomicU64,
    rejected_transitions: AtomicU64,
}

impl EngineMetrics {
    /// Creates a collector with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A listing was dropped for a non-finite or out-of-range coordinate.
    pub fn invalid_coordinate(&self) {
        self.invalid_coordinates.fetch_add(1, Ordering::Relaxed);
    }

    /// A listing was dropped for a reason other than its coordinate.
    pub fn invalid_listing(&self) {
        self.invalid_listings.fetch_add(1, Ordering::Relaxed);
    }

    /// A clustering pass ran and emitted `clusters` clusters.
    pub fn cluster_pass(&self, clusters: usize) {
        self.cluster_passes.fetch_add(1, Ordering::Relaxed);
        self.clusters_emitted
            .fetch_add(clusters as u64, Ordering::Relaxed);
    }

    /// The viewport selector served a cached result.
    pub fn selector_cache_hit(&self) {
        self.selector_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// The viewport selector had to truncate to its marker budget.
    pub fn selector_truncation(&self) {
        self.selector_truncations.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` points were admitted into the loaded set.
    pub fn admitted(&self, count: usize) {
        self.admitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// `count` points left the unload band and were evicted.
    pub fn evicted_out_of_band(&self, count: usize) {
        self.evicted_out_of_band
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// `count` points were evicted to stay within capacity.
    pub fn evicted_capacity(&self, count: usize) {
        self.evicted_capacity
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// An admission tick ran.
    pub fn admission_tick(&self) {
        self.admission_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// The render strategy changed.
    pub fn strategy_switch(&self) {
        self.strategy_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// A cluster expansion started.
    pub fn expansion(&self) {
        self.expansions.fetch_add(1, Ordering::Relaxed);
    }

    /// An expand/contract request was rejected by the state machine.
    pub fn rejected_transition(&self) {
        self.rejected_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invalid_coordinates: self.invalid_coordinates.load(Ordering::Relaxed),
            invalid_listings: self.invalid_listings.load(Ordering::Relaxed),
            cluster_passes: self.cluster_passes.load(Ordering::Relaxed),
            clusters_emitted: self.clusters_emitted.load(Ordering::Relaxed),
            selector_cache_hits: self.selector_cache_hits.load(Ordering::Relaxed),
            selector_truncations: self.selector_truncations.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            evicted_out_of_band: self.evicted_out_of_band.load(Ordering::Relaxed),
            evicted_capacity: self.evicted_capacity.load(Ordering::Relaxed),
            admission_ticks: self.admission_ticks.load(Ordering::Relaxed),
            strategy_switches: self.strategy_switches.load(Ordering::Relaxed),
            expansions: self.expansions.load(Ordering::Relaxed),
            rejected_transitions: self.rejected_transitions.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        for counter in [
            &self.invalid_coordinates,
            &self.invalid_listings,
            &self.cluster_passes,
            &self.clusters_emitted,
            &self.selector_cache_hits,
            &self.selector_truncations,
            &self.admitted,
            &self.evicted_out_of_band,
            &self.evicted_capacity,
            &self.admission_ticks,
            &self.strategy_switches,
            &self.expansions,
            &self.rejected_transitions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = EngineMetrics::new();
        metrics.cluster_pass(3);
        metrics.cluster_pass(2);
        metrics.admitted(20);
        metrics.admitted(5);
        metrics.evicted_capacity(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cluster_passes, 2);
        assert_eq!(snapshot.clusters_emitted, 5);
        assert_eq!(snapshot.admitted, 25);
        assert_eq!(snapshot.evicted_capacity, 4);
    }

    #[test]
    fn test_reset_clears_counters() {
        let metrics = EngineMetrics::new();
        metrics.invalid_coordinate();
        metrics.strategy_switch();
        metrics.rejected_transition();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_shared_through_arc() {
        let metrics = Arc::new(EngineMetrics::new());
        let clone = Arc::clone(&metrics);
        clone.selector_cache_hit();
        assert_eq!(metrics.snapshot().selector_cache_hits, 1);
    }
}
