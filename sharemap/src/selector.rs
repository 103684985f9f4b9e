//! Viewport selection: bounds filtering plus priority truncation.
//!
//! The selector keeps the listings inside the (buffered) viewport and, when
//! more remain than the marker budget allows, keeps the highest-priority
//! ones. The buffer pre-loads markers just off-screen so a short pan does not
//! reveal empty map.
//!
//! # Caching
//!
//! A selector remembers its last result. If the next call's viewport is
//! within `cache_epsilon` of the previous one (and the listings, budget and
//! user location are unchanged), the previous result is returned as-is. This
//! skips redundant work on jittery gesture updates and keeps near-equal
//! scores from reordering markers on screen.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::geo::{Coordinate, Viewport};
use crate::listing::GeoPoint;
use crate::scoring::rank_by_priority;
use crate::telemetry::EngineMetrics;

/// Default buffer added around the viewport, as a fraction of its span.
pub const DEFAULT_BUFFER_RATIO: f64 = 0.15;

/// Default marker budget.
pub const DEFAULT_MAX_MARKERS: usize = 100;

/// Default viewport movement (degrees) below which the cache is reused.
pub const DEFAULT_CACHE_EPSILON: f64 = 0.001;

/// Viewport selector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorConfig {
    /// Fraction of each span added on every side of the viewport.
    pub buffer_ratio: f64,
    /// Maximum markers returned.
    pub max_markers: usize,
    /// Maximum per-component viewport change that still hits the cache.
    pub cache_epsilon: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            buffer_ratio: DEFAULT_BUFFER_RATIO,
            max_markers: DEFAULT_MAX_MARKERS,
            cache_epsilon: DEFAULT_CACHE_EPSILON,
        }
    }
}

/// Result of an uncached selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected points: input order if untruncated, else descending priority.
    pub points: Vec<GeoPoint>,
    /// Points inside the buffered bounds before truncation.
    pub in_bounds: usize,
}

impl Selection {
    /// Whether the budget cut any in-bounds points.
    pub fn was_truncated(&self) -> bool {
        self.points.len() < self.in_bounds
    }
}

/// Selects points inside the buffered viewport, truncated to `max_markers`.
///
/// When truncation is needed the result is the top `max_markers` points by
/// [`priority_score`](crate::scoring::priority_score), highest first, with
/// ties broken by input order.
pub fn select_in_viewport(
    points: &[GeoPoint],
    viewport: &Viewport,
    buffer_ratio: f64,
    max_markers: usize,
    user_location: Option<Coordinate>,
) -> Selection {
    let bounds = viewport.buffered_bounds(buffer_ratio);
    let visible: Vec<GeoPoint> = points
        .iter()
        .filter(|p| bounds.contains(p.coordinate()))
        .cloned()
        .collect();
    let in_bounds = visible.len();

    if in_bounds <= max_markers {
        return Selection {
            points: visible,
            in_bounds,
        };
    }

    let order = rank_by_priority(&visible, user_location);
    let selected = order
        .into_iter()
        .take(max_markers)
        .map(|i| visible[i].clone())
        .collect();

    Selection {
        points: selected,
        in_bounds,
    }
}

#[derive(Debug, Clone)]
struct CachedSelection {
    viewport: Viewport,
    fingerprint: u64,
    max_markers: usize,
    user_location: Option<Coordinate>,
    points: Vec<GeoPoint>,
}

/// Stateful selector with a one-entry result cache.
#[derive(Debug, Clone, Default)]
pub struct ViewportSelector {
    config: SelectorConfig,
    cache: Option<CachedSelection>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl ViewportSelector {
    /// Creates a selector.
    pub fn new(config: SelectorConfig) -> Self {
        Self {
            config,
            cache: None,
            metrics: None,
        }
    }

    /// Records cache hits and truncations in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Selects with the configured budget.
    pub fn select(
        &mut self,
        points: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
    ) -> Vec<GeoPoint> {
        self.select_with_budget(points, viewport, self.config.max_markers, user_location)
    }

    /// Selects with an explicit budget.
    pub fn select_with_budget(
        &mut self,
        points: &[GeoPoint],
        viewport: &Viewport,
        max_markers: usize,
        user_location: Option<Coordinate>,
    ) -> Vec<GeoPoint> {
        let fingerprint = fingerprint(points);
        let epsilon = self.config.cache_epsilon;

        if let Some(cached) = &self.cache {
            let same_user = match (cached.user_location, user_location) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    (a.latitude - b.latitude).abs() <= epsilon
                        && (a.longitude - b.longitude).abs() <= epsilon
                }
                _ => false,
            };
            if cached.fingerprint == fingerprint
                && cached.max_markers == max_markers
                && same_user
                && cached.viewport.is_within(viewport, epsilon)
            {
                if let Some(metrics) = &self.metrics {
                    metrics.selector_cache_hit();
                }
                return cached.points.clone();
            }
        }

        let selection = select_in_viewport(
            points,
            viewport,
            self.config.buffer_ratio,
            max_markers,
            user_location,
        );

        if selection.was_truncated() {
            tracing::debug!(
                in_bounds = selection.in_bounds,
                max_markers,
                "Viewport selection truncated to budget"
            );
            if let Some(metrics) = &self.metrics {
                metrics.selector_truncation();
            }
        }

        self.cache = Some(CachedSelection {
            viewport: *viewport,
            fingerprint,
            max_markers,
            user_location,
            points: selection.points.clone(),
        });

        selection.points
    }

    /// Drops the cached result.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Cheap identity of a listing set, covering every field that affects
/// selection.
fn fingerprint(points: &[GeoPoint]) -> u64 {
    let mut hasher = DefaultHasher::new();
    points.len().hash(&mut hasher);
    for p in points {
        p.id.hash(&mut hasher);
        p.latitude.to_bits().hash(&mut hasher);
        p.longitude.to_bits().hash(&mut hasher);
        p.availability.hash(&mut hasher);
        p.is_urgent.hash(&mut hasher);
        p.rating.map(f64::to_bits).hash(&mut hasher);
        p.is_verified.hash(&mut hasher);
    }
    hasher.finish()
}
