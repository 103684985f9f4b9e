//! Point-in-time copy of the engine counters.

use std::fmt;

use serde::Serialize;

/// Values of every [`EngineMetrics`](super::EngineMetrics) counter at one
/// moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Listings dropped for invalid coordinates.
    pub invalid_coordinates: u64,
    /// Listings dropped for other validation failures.
    pub invalid_listings: u64,
    /// Clustering passes run.
    pub cluster_passes: u64,
    /// Clusters emitted across all passes.
    pub clusters_emitted: u64,
    /// Viewport selections served from cache.
    pub selector_cache_hits: u64,
    /// Viewport selections truncated to the marker budget.
    pub selector_truncations: u64,
    /// Points admitted into the loaded set.
    pub admitted: u64,
    /// Points evicted for leaving the unload band.
    pub evicted_out_of_band: u64,
    /// Points evicted to respect capacity.
    pub evicted_capacity: u64,
    /// Admission ticks run.
    pub admission_ticks: u64,
    /// Render strategy changes.
    pub strategy_switches: u64,
    /// Cluster expansions started.
    pub expansions: u64,
    /// Expand/contract requests rejected by the state machine.
    pub rejected_transitions: u64,
}

impl MetricsSnapshot {
    /// Total evictions of either kind.
    pub fn total_evictions(&self) -> u64 {
        self.evicted_out_of_band + self.evicted_capacity
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropped={} passes={} clusters={} cache_hits={} truncations={} \
             admitted={} evicted={} ticks={} switches={} expansions={} rejected={}",
            self.invalid_coordinates + self.invalid_listings,
            self.cluster_passes,
            self.clusters_emitted,
            self.selector_cache_hits,
            self.selector_truncations,
            self.admitted,
            self.total_evictions(),
            self.admission_ticks,
            self.strategy_switches,
            self.expansions,
            self.rejected_transitions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_evictions() {
        let snapshot = MetricsSnapshot {
            evicted_out_of_band: 3,
            evicted_capacity: 4,
            ..Default::default()
        };
        assert_eq!(snapshot.total_evictions(), 7);
    }

    #[test]
    fn test_display_summarizes_counters() {
        let snapshot = MetricsSnapshot {
            invalid_coordinates: 2,
            invalid_listings: 1,
            admitted: 10,
            ..Default::default()
        };
        let text = snapshot.to_string();
        assert!(text.contains("dropped=3"));
        assert!(text.contains("admitted=10"));
    }

    #[test]
    fn test_serializes_to_json() {
        let snapshot = MetricsSnapshot {
            cluster_passes: 4,
            ..Default::default()
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["cluster_passes"], 4);
    }
}
