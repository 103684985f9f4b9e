//! Synchronous map session: debounce, admission ticks and expansion timing
//! around a [`RenderPipeline`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::expansion::{ClusterExpansionMachine, ExpansionEvent, ExpansionState};
use crate::geo::{Coordinate, Viewport};
use crate::listing::{all_valid_and_unique, retain_valid, GeoPoint};
use crate::render::{ExpansionOverlay, RenderPipeline, RenderPlan};
use crate::strategy::RenderStrategy;
use crate::telemetry::{EngineMetrics, MetricsSnapshot};

/// Default settle delay after the last viewport change.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Session timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// How long the viewport must stay still before a re-render.
    pub debounce: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// One map screen's rendering state.
///
/// The session never reads the clock: every event carries `now`, and the
/// host calls [`MapSession::poll`] at [`MapSession::next_deadline`]. Three
/// kinds of deadline exist: the viewport debounce, the admission tick and
/// the expansion animation.
///
/// After [`MapSession::on_session_dispose`] every call is a no-op.
#[derive(Debug)]
pub struct MapSession {
    timing: SessionTiming,
    pipeline: RenderPipeline,
    expansion: ClusterExpansionMachine,
    metrics: Arc<EngineMetrics>,

    listings: Vec<GeoPoint>,
    user_location: Option<Coordinate>,
    viewport: Option<Viewport>,
    /// Latest unsettled viewport and when it settles.
    pending_viewport: Option<(Viewport, Instant)>,
    plan: Option<RenderPlan>,
    /// Inputs changed since the last render.
    dirty: bool,
    disposed: bool,
}

impl MapSession {
    /// Creates a session with its own metrics.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_metrics(config, Arc::new(EngineMetrics::new()))
    }

    /// Creates a session reporting into `metrics`.
    pub fn with_metrics(config: &EngineConfig, metrics: Arc<EngineMetrics>) -> Self {
        tracing::info!(
            debounce_ms = config.session.debounce.as_millis() as u64,
            max_loaded = config.admission.max_loaded,
            "Map session started"
        );
        Self {
            timing: config.session,
            pipeline: RenderPipeline::new(config, Arc::clone(&metrics)),
            expansion: ClusterExpansionMachine::new(config.expansion, Arc::clone(&metrics)),
            metrics,
            listings: Vec::new(),
            user_location: None,
            viewport: None,
            pending_viewport: None,
            plan: None,
            dirty: false,
            disposed: false,
        }
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Last rendered plan.
    pub fn plan(&self) -> Option<&RenderPlan> {
        self.plan.as_ref()
    }

    /// Last settled viewport.
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn listings(&self) -> &[GeoPoint] {
        &self.listings
    }

    pub fn expansion_state(&self) -> &ExpansionState {
        self.expansion.state()
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Replaces the listing set; points with invalid coordinates or a
    /// repeated id are dropped and counted.
    ///
    /// Takes effect on the next [`MapSession::poll`].
    pub fn set_listings(&mut self, listings: Vec<GeoPoint>) {
        if self.disposed {
            return;
        }
        self.listings = if all_valid_and_unique(&listings) {
            listings
        } else {
            retain_valid(&listings, &self.metrics)
        };
        self.dirty = true;
    }

    /// Sets or clears the user's location. Takes effect on the next poll.
    pub fn set_user_location(&mut self, user_location: Option<Coordinate>) {
        if self.disposed {
            return;
        }
        self.user_location = user_location.filter(Coordinate::is_valid);
        self.dirty = true;
    }

    /// Forces a render strategy. Takes effect on the next poll.
    pub fn force_strategy(&mut self, strategy: Option<RenderStrategy>) {
        if self.disposed {
            return;
        }
        self.pipeline.force_strategy(strategy);
        self.dirty = true;
    }

    /// Records an intermediate viewport while the user is panning.
    ///
    /// Supersedes any earlier unsettled viewport and drops the admission
    /// batch queued for the old one.
    pub fn on_viewport_changed(&mut self, viewport: Viewport, now: Instant) {
        if self.disposed {
            return;
        }
        let settles_at = now + self.timing.debounce;
        self.pending_viewport = Some((viewport, settles_at));
        self.pipeline.cancel_pending();
        tracing::trace!(
            center_lat = viewport.center_lat,
            center_lon = viewport.center_lon,
            "Viewport changed, debouncing"
        );
    }

    /// Re-renders for a settled viewport immediately.
    pub fn on_viewport_settled(&mut self, viewport: Viewport, now: Instant) -> Option<&RenderPlan> {
        if self.disposed {
            return None;
        }
        self.pending_viewport = None;
        self.viewport = Some(viewport);
        self.render(now);
        self.plan.as_ref()
    }

    /// Expands the tapped cluster.
    ///
    /// Returns `false` if the cluster is not on screen or the expansion
    /// machine rejected the request.
    pub fn on_cluster_tapped(&mut self, cluster_id: &str, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        let Some(cluster) = self.plan.as_ref().and_then(|p| p.cluster(cluster_id)) else {
            tracing::debug!(cluster_id, "Tapped cluster is not in the current plan");
            return false;
        };
        let expanded = self.expansion.expand(cluster, now);
        if expanded {
            self.refresh_overlay();
        }
        expanded
    }

    /// Contracts the expanded cluster.
    pub fn on_contract_requested(&mut self, now: Instant) -> bool {
        if self.disposed {
            return false;
        }
        let contracted = self.expansion.contract(now);
        if contracted {
            self.refresh_overlay();
        }
        contracted
    }

    /// Forwards an animation event from the renderer.
    pub fn on_animation_event(&mut self, event: ExpansionEvent) -> bool {
        if self.disposed {
            return false;
        }
        let changed = self.expansion.handle(event);
        if changed {
            self.refresh_overlay();
        }
        changed
    }

    /// Runs whatever is due at `now`.
    ///
    /// Returns the plan if it changed.
    pub fn poll(&mut self, now: Instant) -> Option<&RenderPlan> {
        if self.disposed {
            return None;
        }
        let mut changed = false;

        match self.pending_viewport {
            Some((viewport, settles_at)) if now >= settles_at => {
                self.pending_viewport = None;
                self.viewport = Some(viewport);
                self.render(now);
                changed = true;
            }
            Some(_) => {}
            None if self.dirty && self.viewport.is_some() => {
                self.render(now);
                changed = true;
            }
            None => {}
        }

        if let Some(viewport) = self.viewport {
            if let Some(plan) = self
                .pipeline
                .tick(&self.listings, &viewport, self.user_location, now)
            {
                self.install(plan);
                changed = true;
            }
        }

        if self.expansion.poll(now) {
            self.refresh_overlay();
            changed = true;
        }

        if changed {
            self.plan.as_ref()
        } else {
            None
        }
    }

    /// Earliest time [`MapSession::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.disposed {
            return None;
        }
        [
            self.pending_viewport.map(|(_, at)| at),
            self.pipeline.next_tick(),
            self.expansion.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Tears the session down.
    ///
    /// Cancels every deadline, clears the admission state, resets the
    /// expansion, logs the final metrics and resets them. Returns the final
    /// snapshot, or `None` if already disposed.
    pub fn on_session_dispose(&mut self) -> Option<MetricsSnapshot> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        self.pending_viewport = None;
        self.pipeline.dispose();
        self.expansion.reset();
        self.plan = None;
        self.listings.clear();

        let snapshot = self.metrics.snapshot();
        tracing::info!(metrics = %snapshot, "Map session disposed");
        self.metrics.reset();
        Some(snapshot)
    }

    fn render(&mut self, now: Instant) {
        let Some(viewport) = self.viewport else {
            return;
        };
        let plan = self
            .pipeline
            .render(&self.listings, &viewport, self.user_location, now);
        self.install(plan);
        self.dirty = false;
    }

    fn install(&mut self, mut plan: RenderPlan) {
        self.expansion.on_clusters_recomputed(&plan.clusters);
        plan.expansion = ExpansionOverlay::from_state(self.expansion.state());
        self.plan = Some(plan);
    }

    fn refresh_overlay(&mut self) {
        if let Some(plan) = &mut self.plan {
            plan.expansion = ExpansionOverlay::from_state(self.expansion.state());
        }
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        self.on_session_dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::ExpansionPhase;

    fn session() -> MapSession {
        MapSession::new(&EngineConfig::default())
    }

    fn viewport() -> Viewport {
        Viewport::new(0.0, 0.0, 0.1, 0.1)
    }

    fn spread(count: usize) -> Vec<GeoPoint> {
        (0..count)
            .map(|i| GeoPoint::new(format!("p{}", i), 0.0, i as f64 * 0.002))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Debounce
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_viewport_change_renders_after_debounce() {
        let mut s = session();
        s.set_listings(spread(5));
        let start = Instant::now();
        s.on_viewport_changed(viewport(), start);

        assert_eq!(s.next_deadline(), Some(start + DEFAULT_DEBOUNCE));
        assert!(s.poll(start + Duration::from_millis(299)).is_none());
        let plan = s.poll(start + DEFAULT_DEBOUNCE).unwrap();
        assert_eq!(plan.individuals.len(), 5);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_newer_viewport_change_supersedes_debounce() {
        let mut s = session();
        s.set_listings(spread(5));
        let start = Instant::now();
        s.on_viewport_changed(viewport(), start);
        let later = start + Duration::from_millis(200);
        let moved = Viewport::new(10.0, 10.0, 0.1, 0.1);
        s.on_viewport_changed(moved, later);

        // The first deadline no longer fires.
        assert!(s.poll(start + DEFAULT_DEBOUNCE).is_none());
        let plan = s.poll(later + DEFAULT_DEBOUNCE).unwrap();
        assert!(plan.is_empty());
        assert_eq!(s.viewport(), Some(&moved));
    }

    #[test]
    fn test_settled_viewport_renders_immediately() {
        let mut s = session();
        s.set_listings(spread(3));
        let now = Instant::now();
        s.on_viewport_changed(Viewport::new(40.0, 40.0, 1.0, 1.0), now);
        let plan = s.on_viewport_settled(viewport(), now).unwrap();
        assert_eq!(plan.individuals.len(), 3);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_listing_change_rerenders_on_poll() {
        let mut s = session();
        let now = Instant::now();
        s.on_viewport_settled(viewport(), now);
        assert!(s.plan().unwrap().is_empty());

        s.set_listings(spread(4));
        let plan = s.poll(now).unwrap();
        assert_eq!(plan.individuals.len(), 4);
        assert!(s.poll(now).is_none());
    }

    #[test]
    fn test_invalid_listings_are_dropped() {
        let mut s = session();
        let mut points = spread(2);
        points.push(GeoPoint::new("bad", 200.0, 0.0));
        s.set_listings(points);
        assert_eq!(s.listings().len(), 2);
        assert_eq!(s.metrics().snapshot().invalid_coordinates, 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admission ticks
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_viewport_change_cancels_pending_admission() {
        let mut s = session();
        s.force_strategy(Some(RenderStrategy::Lazy));
        s.set_listings(spread(30));
        let now = Instant::now();
        s.on_viewport_settled(Viewport::new(0.0, 0.03, 0.2, 0.2), now);
        assert!(s.pipeline().admission().has_pending());

        s.on_viewport_changed(viewport(), now);
        assert!(!s.pipeline().admission().has_pending());
        assert_eq!(s.next_deadline(), Some(now + DEFAULT_DEBOUNCE));
    }

    #[test]
    fn test_poll_advances_admission() {
        let mut s = session();
        s.force_strategy(Some(RenderStrategy::Lazy));
        s.set_listings(spread(30));
        let now = Instant::now();
        let first = s
            .on_viewport_settled(Viewport::new(0.0, 0.03, 0.2, 0.2), now)
            .unwrap()
            .individuals
            .len();
        assert_eq!(first, 20);

        let due = s.next_deadline().unwrap();
        let plan = s.poll(due).unwrap();
        assert_eq!(plan.individuals.len(), 30);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expansion
    // ─────────────────────────────────────────────────────────────────────────

    fn clustered_session(now: Instant) -> (MapSession, String) {
        let mut s = session();
        s.force_strategy(Some(RenderStrategy::Clustered));
        s.set_listings(vec![
            GeoPoint::new("a", 0.0, 0.0),
            GeoPoint::new("b", 0.0, 0.0001),
            GeoPoint::new("c", 10.0, 10.0),
        ]);
        let plan = s
            .on_viewport_settled(Viewport::new(5.0, 5.0, 11.25, 11.25), now)
            .unwrap();
        let id = plan.clusters[0].id().to_string();
        (s, id)
    }

    #[test]
    fn test_tap_expands_cluster_into_overlay() {
        let now = Instant::now();
        let (mut s, id) = clustered_session(now);
        assert!(s.on_cluster_tapped(&id, now));

        let overlay = s.plan().unwrap().expansion.clone().unwrap();
        assert_eq!(overlay.cluster_id, id);
        assert_eq!(overlay.phase, ExpansionPhase::Expanding);
        assert_eq!(overlay.members.len(), 2);

        let due = s.next_deadline().unwrap();
        let plan = s.poll(due).unwrap();
        assert_eq!(
            plan.expansion.as_ref().map(|o| o.phase),
            Some(ExpansionPhase::Expanded)
        );
    }

    #[test]
    fn test_tap_unknown_cluster_is_rejected() {
        let now = Instant::now();
        let (mut s, _) = clustered_session(now);
        assert!(!s.on_cluster_tapped("cluster-nope", now));
        assert!(s.expansion_state().is_idle());
    }

    #[test]
    fn test_recompute_drops_stale_expansion() {
        let now = Instant::now();
        let (mut s, id) = clustered_session(now);
        s.on_cluster_tapped(&id, now);
        s.on_animation_event(ExpansionEvent::AnimationFinished);

        // Zoom in until nothing clusters.
        let plan = s
            .on_viewport_settled(Viewport::new(0.0, 0.0, 0.0001, 0.0001), now)
            .unwrap();
        assert!(plan.clusters.is_empty());
        assert!(plan.expansion.is_none());
        assert!(s.expansion_state().is_idle());
    }

    #[test]
    fn test_removed_member_is_not_drawn_in_overlay() {
        let now = Instant::now();
        let (mut s, id) = clustered_session(now);
        s.set_listings(vec![
            GeoPoint::new("a", 0.0, 0.0),
            GeoPoint::new("b", 0.0, 0.0001),
            GeoPoint::new("gone", 0.0001, 0.0),
            GeoPoint::new("c", 10.0, 10.0),
        ]);
        s.poll(now);
        assert!(s.on_cluster_tapped(&id, now));
        s.on_animation_event(ExpansionEvent::AnimationFinished);
        assert_eq!(s.plan().unwrap().expansion.as_ref().unwrap().members.len(), 3);

        s.set_listings(vec![
            GeoPoint::new("a", 0.0, 0.0),
            GeoPoint::new("b", 0.0, 0.0001),
            GeoPoint::new("c", 10.0, 10.0),
        ]);
        let plan = s.poll(now).unwrap();
        assert_eq!(plan.clusters[0].id(), id);
        assert_eq!(plan.clusters[0].point_count(), 2);
        assert!(plan.expansion.is_none());
        assert!(s.expansion_state().is_idle());
    }

    #[test]
    fn test_contract_request() {
        let now = Instant::now();
        let (mut s, id) = clustered_session(now);
        assert!(!s.on_contract_requested(now));
        s.on_cluster_tapped(&id, now);
        s.on_animation_event(ExpansionEvent::AnimationFinished);
        assert!(s.on_contract_requested(now));
        assert_eq!(
            s.plan().unwrap().expansion.as_ref().map(|o| o.phase),
            Some(ExpansionPhase::Contracting)
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispose
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_dispose_cancels_everything() {
        let mut s = session();
        s.set_listings(spread(5));
        let now = Instant::now();
        s.on_viewport_settled(viewport(), now);
        s.on_viewport_changed(Viewport::new(1.0, 1.0, 0.1, 0.1), now);

        let snapshot = s.on_session_dispose().unwrap();
        assert!(snapshot.selector_cache_hits == 0);
        assert!(s.is_disposed());
        assert_eq!(s.next_deadline(), None);
        assert!(s.plan().is_none());
        assert!(s.poll(now + DEFAULT_DEBOUNCE).is_none());
        assert_eq!(s.metrics().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_dispose_twice_is_noop() {
        let mut s = session();
        assert!(s.on_session_dispose().is_some());
        assert!(s.on_session_dispose().is_none());
        s.set_listings(spread(3));
        assert!(s.listings().is_empty());
        assert!(s.on_viewport_settled(viewport(), Instant::now()).is_none());
    }
}
