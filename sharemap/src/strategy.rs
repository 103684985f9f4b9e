//! Render strategy selection by dataset size.
//!
//! ```text
//! listings   0 ──── 50 ──── 100 ──── 200 ────▶
//!            ViewportOnly │ Clustered │ Lazy │ Hybrid
//! ```
//!
//! Small datasets are drawn directly; larger ones add clustering, lazy
//! admission, or both. A caller may force a strategy, which bypasses the
//! thresholds entirely.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::telemetry::EngineMetrics;

/// Default largest count rendered with [`RenderStrategy::ViewportOnly`].
pub const DEFAULT_VIEWPORT_ONLY_MAX: usize = 50;

/// Default largest count rendered with [`RenderStrategy::Clustered`].
pub const DEFAULT_CLUSTERED_MAX: usize = 100;

/// Default largest count rendered with [`RenderStrategy::Lazy`].
pub const DEFAULT_LAZY_MAX: usize = 200;

/// How a frame's listings are turned into markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Viewport selection only.
    ViewportOnly,
    /// Clustering over all listings.
    Clustered,
    /// Viewport selection followed by lazy admission.
    Lazy,
    /// Lazy admission followed by clustering of the loaded set.
    Hybrid,
}

impl RenderStrategy {
    /// Stable lowercase name, used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStrategy::ViewportOnly => "viewport_only",
            RenderStrategy::Clustered => "clustered",
            RenderStrategy::Lazy => "lazy",
            RenderStrategy::Hybrid => "hybrid",
        }
    }

    /// Parses a name produced by [`RenderStrategy::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "viewport_only" | "viewport-only" => Some(RenderStrategy::ViewportOnly),
            "clustered" => Some(RenderStrategy::Clustered),
            "lazy" => Some(RenderStrategy::Lazy),
            "hybrid" => Some(RenderStrategy::Hybrid),
            _ => None,
        }
    }

    /// Whether this strategy runs the admission controller.
    pub fn uses_admission(&self) -> bool {
        matches!(self, RenderStrategy::Lazy | RenderStrategy::Hybrid)
    }
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper bounds (inclusive) of each automatic strategy band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyThresholds {
    pub viewport_only_max: usize,
    pub clustered_max: usize,
    pub lazy_max: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            viewport_only_max: DEFAULT_VIEWPORT_ONLY_MAX,
            clustered_max: DEFAULT_CLUSTERED_MAX,
            lazy_max: DEFAULT_LAZY_MAX,
        }
    }
}

impl StrategyThresholds {
    /// Creates thresholds from the three band limits.
    pub fn new(viewport_only_max: usize, clustered_max: usize, lazy_max: usize) -> Self {
        Self {
            viewport_only_max,
            clustered_max,
            lazy_max,
        }
    }

    /// Whether the bands are strictly increasing.
    pub fn is_ordered(&self) -> bool {
        self.viewport_only_max < self.clustered_max && self.clustered_max < self.lazy_max
    }

    /// Automatic strategy for `listing_count`.
    pub fn strategy_for(&self, listing_count: usize) -> RenderStrategy {
        if listing_count <= self.viewport_only_max {
            RenderStrategy::ViewportOnly
        } else if listing_count <= self.clustered_max {
            RenderStrategy::Clustered
        } else if listing_count <= self.lazy_max {
            RenderStrategy::Lazy
        } else {
            RenderStrategy::Hybrid
        }
    }
}

/// Result of a strategy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDecision {
    /// Strategy to render with.
    pub strategy: RenderStrategy,
    /// Whether it differs from the previous decision.
    pub switched: bool,
}

/// Tracks the active render strategy across frames.
///
/// The automatic choice is only re-derived when the listing count moves
/// into a different band; counts that stay inside a band keep the current
/// strategy without re-evaluation.
#[derive(Debug)]
pub struct RenderStrategySelector {
    thresholds: StrategyThresholds,
    forced: Option<RenderStrategy>,
    current: Option<RenderStrategy>,
    last_count: Option<usize>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl RenderStrategySelector {
    /// Creates a selector with no strategy chosen yet.
    pub fn new(thresholds: StrategyThresholds) -> Self {
        Self {
            thresholds,
            forced: None,
            current: None,
            last_count: None,
            metrics: None,
        }
    }

    /// Records strategy switches into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Band limits in use.
    pub fn thresholds(&self) -> &StrategyThresholds {
        &self.thresholds
    }

    /// Strategy of the last decision, if any.
    pub fn current(&self) -> Option<RenderStrategy> {
        self.current
    }

    /// Forced strategy, if any.
    pub fn forced(&self) -> Option<RenderStrategy> {
        self.forced
    }

    /// Forces a strategy, or returns to automatic selection with `None`.
    ///
    /// Takes effect on the next [`RenderStrategySelector::select`].
    pub fn force(&mut self, strategy: Option<RenderStrategy>) {
        if self.forced != strategy {
            tracing::info!(
                forced = strategy.map(|s| s.as_str()).unwrap_or("none"),
                "Render strategy override changed"
            );
        }
        self.forced = strategy;
        // Re-derive the automatic choice once the override is lifted.
        self.last_count = None;
    }

    /// Picks the strategy for a frame with `listing_count` listings.
    pub fn select(&mut self, listing_count: usize) -> StrategyDecision {
        let next = match self.forced {
            Some(forced) => forced,
            None => match (self.current, self.last_count) {
                (Some(current), Some(last)) if !self.crossed_threshold(last, listing_count) => {
                    current
                }
                _ => self.thresholds.strategy_for(listing_count),
            },
        };
        self.last_count = Some(listing_count);

        let switched = self.current != Some(next);
        if switched {
            tracing::info!(
                from = self.current.map(|s| s.as_str()).unwrap_or("none"),
                to = next.as_str(),
                listing_count,
                "Render strategy switched"
            );
            if self.current.is_some() {
                if let Some(metrics) = &self.metrics {
                    metrics.strategy_switch();
                }
            }
            self.current = Some(next);
        }

        StrategyDecision {
            strategy: next,
            switched,
        }
    }

    fn crossed_threshold(&self, previous: usize, current: usize) -> bool {
        self.thresholds.strategy_for(previous) != self.thresholds.strategy_for(current)
    }
}

impl Default for RenderStrategySelector {
    fn default() -> Self {
        Self::new(StrategyThresholds::default())
    }
}
