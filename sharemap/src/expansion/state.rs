//! Expansion states, events and member layout.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::geo::Coordinate;

/// Default radius of the expansion circle, in degrees.
pub const DEFAULT_EXPANSION_RADIUS_DEG: f64 = 0.0005;

/// Default duration of the expand and contract animations.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(300);

/// Configuration for cluster expansion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionConfig {
    /// Radius of the member circle around the centroid, in degrees.
    pub radius_deg: f64,
    /// How long an expand or contract animation runs before completing on
    /// its own.
    pub animation_duration: Duration,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            radius_deg: DEFAULT_EXPANSION_RADIUS_DEG,
            animation_duration: DEFAULT_ANIMATION_DURATION,
        }
    }
}

impl ExpansionConfig {
    /// Sets the circle radius.
    pub fn with_radius_deg(mut self, radius_deg: f64) -> Self {
        self.radius_deg = radius_deg;
        self
    }

    /// Sets the animation duration.
    pub fn with_animation_duration(mut self, animation_duration: Duration) -> Self {
        self.animation_duration = animation_duration;
        self
    }
}

/// A cluster member placed on the expansion circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedMember {
    pub id: String,
    pub position: Coordinate,
}

/// Phase of a non-idle expansion, as exposed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionPhase {
    Expanding,
    Expanded,
    Contracting,
}

/// Expansion state. At most one cluster is expanded at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionState {
    /// No cluster is expanded.
    Idle,

    /// Members are animating out of the cluster.
    Expanding {
        cluster_id: String,
        members: Vec<ExpandedMember>,
        /// When the current animation started.
        started_at: Instant,
    },

    /// Members are laid out around the centroid.
    Expanded {
        cluster_id: String,
        members: Vec<ExpandedMember>,
    },

    /// Members are animating back into the cluster.
    Contracting {
        cluster_id: String,
        members: Vec<ExpandedMember>,
        started_at: Instant,
    },
}

impl ExpansionState {
    /// Id of the cluster this state refers to, if not idle.
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            ExpansionState::Idle => None,
            ExpansionState::Expanding { cluster_id, .. }
            | ExpansionState::Expanded { cluster_id, .. }
            | ExpansionState::Contracting { cluster_id, .. } => Some(cluster_id),
        }
    }

    /// Laid-out members, empty when idle.
    pub fn members(&self) -> &[ExpandedMember] {
        match self {
            ExpansionState::Idle => &[],
            ExpansionState::Expanding { members, .. }
            | ExpansionState::Expanded { members, .. }
            | ExpansionState::Contracting { members, .. } => members,
        }
    }

    /// Phase, or `None` when idle.
    pub fn phase(&self) -> Option<ExpansionPhase> {
        match self {
            ExpansionState::Idle => None,
            ExpansionState::Expanding { .. } => Some(ExpansionPhase::Expanding),
            ExpansionState::Expanded { .. } => Some(ExpansionPhase::Expanded),
            ExpansionState::Contracting { .. } => Some(ExpansionPhase::Contracting),
        }
    }

    /// Whether an animation is in flight.
    pub fn is_animating(&self) -> bool {
        matches!(
            self,
            ExpansionState::Expanding { .. } | ExpansionState::Contracting { .. }
        )
    }

    /// Whether no cluster is expanded or animating.
    pub fn is_idle(&self) -> bool {
        matches!(self, ExpansionState::Idle)
    }
}

/// Animation lifecycle events from the renderer.
///
/// The machine also completes animations on its own once
/// `animation_duration` has elapsed, so a renderer that never reports
/// events still sees the machine settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionEvent {
    /// The renderer started the current animation at this instant.
    AnimationStarted { at: Instant },
    /// The renderer finished the current animation.
    AnimationFinished,
}

/// Positions of `count` members on a circle of `radius` degrees around
/// `centroid`.
///
/// Member `i` sits at angle `i · 2π / count`, with
/// `lat = centroid.lat + r·cos(angle)` and `lon = centroid.lon + r·sin(angle)`.
pub fn circle_positions(centroid: Coordinate, count: usize, radius: f64) -> Vec<Coordinate> {
    if count == 0 {
        return Vec::new();
    }
    let step = TAU / count as f64;
    (0..count)
        .map(|i| {
            let angle = step * i as f64;
            Coordinate::new(
                centroid.latitude + radius * angle.cos(),
                centroid.longitude + radius * angle.sin(),
            )
        })
        .collect()
}
