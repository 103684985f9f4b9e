//! Render-ready output of one frame.

use serde::Serialize;

use crate::cluster::Cluster;
use crate::expansion::{ExpandedMember, ExpansionPhase, ExpansionState};
use crate::listing::GeoPoint;
use crate::strategy::RenderStrategy;

/// Member layout of the expanded cluster, for the renderer to animate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionOverlay {
    pub cluster_id: String,
    pub phase: ExpansionPhase,
    pub members: Vec<ExpandedMember>,
}

impl ExpansionOverlay {
    /// Overlay for a non-idle expansion state.
    pub fn from_state(state: &ExpansionState) -> Option<Self> {
        Some(Self {
            cluster_id: state.cluster_id()?.to_string(),
            phase: state.phase()?,
            members: state.members().to_vec(),
        })
    }
}

/// Markers to draw for a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    /// Strategy that produced the plan.
    pub strategy: RenderStrategy,
    /// Listings drawn as individual pins.
    pub individuals: Vec<GeoPoint>,
    /// Cluster markers.
    pub clusters: Vec<Cluster>,
    /// Expanded cluster overlay, if a cluster is expanded.
    pub expansion: Option<ExpansionOverlay>,
}

impl RenderPlan {
    /// A plan with nothing to draw.
    pub fn empty(strategy: RenderStrategy) -> Self {
        Self {
            strategy,
            individuals: Vec::new(),
            clusters: Vec::new(),
            expansion: None,
        }
    }

    /// Whether there are no markers.
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty() && self.clusters.is_empty()
    }

    /// Number of pins plus cluster markers.
    pub fn marker_count(&self) -> usize {
        self.individuals.len() + self.clusters.len()
    }

    /// Number of listings represented, counting cluster members.
    pub fn represented_points(&self) -> usize {
        self.individuals.len() + self.clusters.iter().map(Cluster::point_count).sum::<usize>()
    }

    /// Looks up a cluster marker by id.
    pub fn cluster(&self, cluster_id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id() == cluster_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    #[test]
    fn test_empty_plan() {
        let plan = RenderPlan::empty(RenderStrategy::ViewportOnly);
        assert!(plan.is_empty());
        assert_eq!(plan.marker_count(), 0);
    }

    #[test]
    fn test_counts() {
        let a = GeoPoint::new("a", 0.0, 0.0);
        let b = GeoPoint::new("b", 0.0, 0.0);
        let c = GeoPoint::new("c", 1.0, 1.0);
        let plan = RenderPlan {
            strategy: RenderStrategy::Clustered,
            individuals: vec![c],
            clusters: vec![Cluster::from_members(&[&a, &b])],
            expansion: None,
        };
        assert_eq!(plan.marker_count(), 2);
        assert_eq!(plan.represented_points(), 3);
        assert!(plan.cluster("cluster-a").is_some());
        assert!(plan.cluster("cluster-c").is_none());
    }

    #[test]
    fn test_overlay_from_idle_is_none() {
        assert!(ExpansionOverlay::from_state(&ExpansionState::Idle).is_none());
    }

    #[test]
    fn test_plan_serializes_as_camel_case() {
        let plan = RenderPlan {
            strategy: RenderStrategy::Hybrid,
            individuals: vec![GeoPoint::new("a", 1.0, 2.0)],
            clusters: Vec::new(),
            expansion: ExpansionOverlay::from_state(&ExpansionState::Expanded {
                cluster_id: "cluster-x".to_string(),
                members: vec![ExpandedMember {
                    id: "x".to_string(),
                    position: Coordinate::new(1.0, 2.0),
                }],
            }),
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["strategy"], "hybrid");
        assert_eq!(json["individuals"][0]["id"], "a");
        assert_eq!(json["expansion"]["clusterId"], "cluster-x");
        assert_eq!(json["expansion"]["phase"], "expanded");
        assert_eq!(json["expansion"]["members"][0]["position"]["latitude"], 1.0);
    }
}
