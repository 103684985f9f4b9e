//! Frame pipeline: strategy selection plus the components it composes.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::admission::AdmissionController;
use crate::cluster::SpatialClusterer;
use crate::config::EngineConfig;
use crate::geo::{Coordinate, Viewport};
use crate::listing::{all_valid_and_unique, retain_valid, GeoPoint};
use crate::selector::ViewportSelector;
use crate::strategy::{RenderStrategy, RenderStrategySelector};
use crate::telemetry::EngineMetrics;

use super::plan::RenderPlan;

/// Maps `(listings, viewport, user location)` frames to [`RenderPlan`]s.
///
/// | strategy     | pipeline                                      |
/// |--------------|-----------------------------------------------|
/// | ViewportOnly | selector                                      |
/// | Clustered    | clusterer over all listings                   |
/// | Lazy         | selector (budget `max_loaded`) → admission    |
/// | Hybrid       | admission over all listings → clusterer       |
///
/// Strategy switches reset the admission working set.
#[derive(Debug)]
pub struct RenderPipeline {
    selector: ViewportSelector,
    clusterer: SpatialClusterer,
    admission: AdmissionController,
    strategy: RenderStrategySelector,
    metrics: Arc<EngineMetrics>,
}

impl RenderPipeline {
    /// Builds the pipeline's components from `config`.
    ///
    /// A `forced_strategy` in `config` is applied up front.
    pub fn new(config: &EngineConfig, metrics: Arc<EngineMetrics>) -> Self {
        let mut strategy =
            RenderStrategySelector::new(config.strategy).with_metrics(Arc::clone(&metrics));
        strategy.force(config.forced_strategy);
        Self {
            selector: ViewportSelector::new(config.selector).with_metrics(Arc::clone(&metrics)),
            clusterer: SpatialClusterer::new(config.clustering, config.screen)
                .with_metrics(Arc::clone(&metrics)),
            admission: AdmissionController::new(config.admission.clone(), Arc::clone(&metrics)),
            strategy,
            metrics,
        }
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn strategy(&self) -> &RenderStrategySelector {
        &self.strategy
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Forces a strategy, or returns to automatic selection with `None`.
    pub fn force_strategy(&mut self, strategy: Option<RenderStrategy>) {
        self.strategy.force(strategy);
    }

    /// When the next admission tick is due, if any.
    pub fn next_tick(&self) -> Option<Instant> {
        self.admission.next_tick()
    }

    /// Drops any admission batch queued for a superseded viewport.
    pub fn cancel_pending(&mut self) {
        self.admission.cancel_pending();
    }

    /// Renders a frame.
    ///
    /// Points with invalid coordinates or repeated ids are dropped and
    /// counted first. An empty listing set yields an empty plan.
    pub fn render(
        &mut self,
        listings: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
        now: Instant,
    ) -> RenderPlan {
        let listings = self.valid_listings(listings);
        let decision = self.strategy.select(listings.len());
        if decision.switched {
            self.admission.reset();
        }
        self.compose(decision.strategy, &listings, viewport, user_location, now, true)
    }

    /// Admits the next batch if due and re-renders.
    ///
    /// Returns `None` when nothing was admitted.
    pub fn tick(
        &mut self,
        listings: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
        now: Instant,
    ) -> Option<RenderPlan> {
        let strategy = self.strategy.current()?;
        if !strategy.uses_admission() || self.admission.tick(now) == 0 {
            return None;
        }
        let listings = self.valid_listings(listings);
        Some(self.compose(strategy, &listings, viewport, user_location, now, false))
    }

    /// Clears the admission state and selector cache for good.
    pub fn dispose(&mut self) {
        self.admission.dispose();
        self.selector.invalidate();
    }

    fn valid_listings<'a>(&self, listings: &'a [GeoPoint]) -> Cow<'a, [GeoPoint]> {
        if all_valid_and_unique(listings) {
            Cow::Borrowed(listings)
        } else {
            Cow::Owned(retain_valid(listings, &self.metrics))
        }
    }

    /// Runs `strategy`'s pipeline. With `refresh` the admission controller
    /// reconciles with the frame; without it the current loaded set is used.
    fn compose(
        &mut self,
        strategy: RenderStrategy,
        listings: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
        now: Instant,
        refresh: bool,
    ) -> RenderPlan {
        if listings.is_empty() {
            return RenderPlan::empty(strategy);
        }

        let mut plan = RenderPlan::empty(strategy);
        match strategy {
            RenderStrategy::ViewportOnly => {
                plan.individuals = self.selector.select(listings, viewport, user_location);
            }
            RenderStrategy::Clustered => {
                let output = self
                    .clusterer
                    .cluster(listings, viewport, viewport.zoom_level());
                plan.individuals = output.singles;
                plan.clusters = output.clusters;
            }
            RenderStrategy::Lazy => {
                let budget = self.admission.config().max_loaded;
                let selected =
                    self.selector
                        .select_with_budget(listings, viewport, budget, user_location);
                plan.individuals = self.admit(&selected, viewport, user_location, now, refresh);
            }
            RenderStrategy::Hybrid => {
                let loaded = self.admit(listings, viewport, user_location, now, refresh);
                let output = self.clusterer.cluster(&loaded, viewport, viewport.zoom_level());
                plan.individuals = output.singles;
                plan.clusters = output.clusters;
            }
        }

        tracing::debug!(
            strategy = %strategy,
            listings = listings.len(),
            individuals = plan.individuals.len(),
            clusters = plan.clusters.len(),
            "Frame rendered"
        );
        plan
    }

    fn admit(
        &mut self,
        points: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
        now: Instant,
        refresh: bool,
    ) -> Vec<GeoPoint> {
        if refresh {
            self.admission.update(points, viewport, user_location, now)
        } else {
            self.admission.loaded_points(points)
        }
    }
}
