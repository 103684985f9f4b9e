//! Expand/contract state machine for a single cluster.

use std::sync::Arc;
use std::time::Instant;

use crate::cluster::Cluster;
use crate::telemetry::EngineMetrics;

use super::state::{
    circle_positions, ExpandedMember, ExpansionConfig, ExpansionEvent, ExpansionState,
};

/// Drives the expansion of one cluster at a time.
///
/// Requests arriving while an animation is in flight are rejected no-ops,
/// so overlapping taps cannot interleave two animations. Time is injected:
/// callers pass `now` and use [`ClusterExpansionMachine::deadline`] to know
/// when to [`poll`](ClusterExpansionMachine::poll).
#[derive(Debug)]
pub struct ClusterExpansionMachine {
    config: ExpansionConfig,
    state: ExpansionState,
    metrics: Arc<EngineMetrics>,
}

impl ClusterExpansionMachine {
    /// Creates an idle machine.
    pub fn new(config: ExpansionConfig, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            config,
            state: ExpansionState::Idle,
            metrics,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Current expansion state.
    pub fn state(&self) -> &ExpansionState {
        &self.state
    }

    /// Starts expanding `cluster`.
    ///
    /// Legal from `Idle`, or from `Expanded` of a different cluster, which
    /// is contracted instantly first. Returns `false` if the request was
    /// rejected.
    pub fn expand(&mut self, cluster: &Cluster, now: Instant) -> bool {
        match &self.state {
            ExpansionState::Idle => {}
            ExpansionState::Expanded { cluster_id, .. } if cluster_id != cluster.id() => {
                tracing::debug!(
                    from = %cluster_id,
                    to = cluster.id(),
                    "Auto-contracting expanded cluster"
                );
            }
            other => {
                tracing::debug!(
                    cluster_id = cluster.id(),
                    phase = ?other.phase(),
                    "Expand rejected"
                );
                self.metrics.rejected_transition();
                return false;
            }
        }

        let positions = circle_positions(
            cluster.centroid(),
            cluster.point_count(),
            self.config.radius_deg,
        );
        let members = cluster
            .member_ids()
            .iter()
            .cloned()
            .zip(positions)
            .map(|(id, position)| ExpandedMember { id, position })
            .collect();

        self.state = ExpansionState::Expanding {
            cluster_id: cluster.id().to_string(),
            members,
            started_at: now,
        };
        self.metrics.expansion();
        tracing::debug!(
            cluster_id = cluster.id(),
            members = cluster.point_count(),
            "Cluster expanding"
        );
        true
    }

    /// Starts contracting the expanded cluster.
    ///
    /// Legal only from `Expanded`. Returns `false` if rejected.
    pub fn contract(&mut self, now: Instant) -> bool {
        match std::mem::replace(&mut self.state, ExpansionState::Idle) {
            ExpansionState::Expanded {
                cluster_id,
                members,
            } => {
                tracing::debug!(cluster_id = %cluster_id, "Cluster contracting");
                self.state = ExpansionState::Contracting {
                    cluster_id,
                    members,
                    started_at: now,
                };
                true
            }
            other => {
                tracing::debug!(phase = ?other.phase(), "Contract rejected");
                self.state = other;
                self.metrics.rejected_transition();
                false
            }
        }
    }

    /// Applies an animation event from the renderer.
    ///
    /// Returns `true` if the state changed.
    pub fn handle(&mut self, event: ExpansionEvent) -> bool {
        match event {
            ExpansionEvent::AnimationStarted { at } => match &mut self.state {
                ExpansionState::Expanding { started_at, .. }
                | ExpansionState::Contracting { started_at, .. } => {
                    *started_at = at;
                    false
                }
                _ => false,
            },
            ExpansionEvent::AnimationFinished => self.finish_animation(),
        }
    }

    /// When the in-flight animation completes on its own, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            ExpansionState::Expanding { started_at, .. }
            | ExpansionState::Contracting { started_at, .. } => {
                Some(*started_at + self.config.animation_duration)
            }
            _ => None,
        }
    }

    /// Completes the in-flight animation if its deadline has passed.
    ///
    /// Returns `true` if the state changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(due) if now >= due => self.finish_animation(),
            _ => false,
        }
    }

    /// Drops the expansion if its cluster is not in `clusters`, or is there
    /// with different members.
    ///
    /// Returns `true` if the machine was forced back to `Idle`.
    pub fn on_clusters_recomputed(&mut self, clusters: &[Cluster]) -> bool {
        let Some(cluster_id) = self.state.cluster_id() else {
            return false;
        };
        let members = self.state.members();
        let unchanged = clusters.iter().any(|c| {
            c.id() == cluster_id
                && c.member_ids().len() == members.len()
                && members.iter().all(|m| c.member_ids().contains(&m.id))
        });
        if unchanged {
            return false;
        }
        tracing::debug!(cluster_id, "Expanded cluster gone or changed, resetting");
        self.state = ExpansionState::Idle;
        true
    }

    /// Returns to `Idle` unconditionally.
    pub fn reset(&mut self) {
        self.state = ExpansionState::Idle;
    }

    fn finish_animation(&mut self) -> bool {
        match std::mem::replace(&mut self.state, ExpansionState::Idle) {
            ExpansionState::Expanding {
                cluster_id,
                members,
                ..
            } => {
                tracing::debug!(cluster_id = %cluster_id, "Cluster expanded");
                self.state = ExpansionState::Expanded {
                    cluster_id,
                    members,
                };
                true
            }
            ExpansionState::Contracting { cluster_id, .. } => {
                tracing::debug!(cluster_id = %cluster_id, "Cluster contracted");
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }
}
