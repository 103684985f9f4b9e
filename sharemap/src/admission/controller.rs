//! Admission controller: a bounded, hysteresis-guarded working set.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::geo::{Coordinate, Viewport};
use crate::listing::GeoPoint;
use crate::scoring::rank_by_priority;
use crate::telemetry::EngineMetrics;

use super::config::AdmissionConfig;

/// Normalized distance of a point from the viewport center.
///
/// Each axis offset is divided by the matching half-span, so `1.0` is one
/// half-viewport away. On a zero-span axis any offset is infinitely far and
/// no offset is zero.
pub fn normalized_distance(point: Coordinate, viewport: &Viewport) -> f64 {
    let dy = normalize(point.latitude - viewport.center_lat, viewport.half_lat_span());
    let dx = normalize(point.longitude - viewport.center_lon, viewport.half_lon_span());
    (dx * dx + dy * dy).sqrt()
}

fn normalize(delta: f64, half_span: f64) -> f64 {
    if half_span > 0.0 && half_span.is_finite() {
        delta / half_span
    } else if delta == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

/// The loaded working set and its admission queue.
#[derive(Debug, Clone, Default)]
pub struct AdmissionState {
    loaded: HashSet<String>,
    /// Loaded ids in admission order, oldest first.
    admission_order: VecDeque<String>,
    /// Ids waiting for admission, highest priority first.
    pending_queue: VecDeque<String>,
    max_loaded: usize,
    batch_size: usize,
}

impl AdmissionState {
    fn new(max_loaded: usize, batch_size: usize) -> Self {
        Self {
            max_loaded,
            batch_size,
            ..Default::default()
        }
    }

    /// Whether `id` is loaded.
    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains(id)
    }

    /// Number of loaded points.
    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    /// Number of points waiting for admission.
    pub fn pending_len(&self) -> usize {
        self.pending_queue.len()
    }

    /// Pending ids, next to be admitted first.
    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.pending_queue.iter().map(String::as_str)
    }

    /// Loaded ids, oldest admission first.
    pub fn loaded_in_admission_order(&self) -> impl Iterator<Item = &str> {
        self.admission_order.iter().map(String::as_str)
    }

    /// Capacity of the loaded set.
    pub fn max_loaded(&self) -> usize {
        self.max_loaded
    }

    /// Points admitted per tick.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn clear(&mut self) {
        self.loaded.clear();
        self.admission_order.clear();
        self.pending_queue.clear();
    }

    fn remove(&mut self, ids: &HashSet<String>) {
        self.loaded.retain(|id| !ids.contains(id));
        self.admission_order.retain(|id| !ids.contains(id));
    }
}

/// Lazily admits points near the viewport into a bounded loaded set.
///
/// # Behavior
///
/// - **Hysteresis**: unloaded points are queued only at or below
///   `load_threshold`; loaded points are evicted only beyond
///   `unload_threshold`. Points between the two keep their state, so a
///   point hovering near one boundary does not flicker.
/// - **Synchronous eviction**: points leaving the band (or the listing set)
///   are removed in the same call.
/// - **Batched admission**: queued points are ordered by priority score and
///   admitted `batch_size` at a time, one batch per tick. `update` admits
///   the first batch immediately and schedules the rest.
/// - **Capacity**: if a batch would overflow `max_loaded`, the oldest
///   admitted points are evicted first (FIFO, not recency-based).
///
/// Time is passed in by the caller, which keeps the controller free of
/// timers; [`AdmissionController::next_tick`] tells the host when to call
/// [`AdmissionController::tick`].
#[derive(Debug)]
pub struct AdmissionController {
    config: AdmissionConfig,
    state: AdmissionState,
    next_tick: Option<Instant>,
    disposed: bool,
    metrics: Arc<EngineMetrics>,
}

impl AdmissionController {
    /// Creates a controller reporting into `metrics`.
    pub fn new(config: AdmissionConfig, metrics: Arc<EngineMetrics>) -> Self {
        let state = AdmissionState::new(config.max_loaded, config.batch_size);
        Self {
            config,
            state,
            next_tick: None,
            disposed: false,
            metrics,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Current working-set state.
    pub fn state(&self) -> &AdmissionState {
        &self.state
    }

    /// When the next admission tick is due, if any.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Whether points are waiting for admission.
    pub fn has_pending(&self) -> bool {
        !self.state.pending_queue.is_empty()
    }

    /// Whether [`AdmissionController::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Reconciles the working set with a new frame.
    ///
    /// Evicts out-of-band points, rebuilds the admission queue (dropping any
    /// batch still pending for the previous viewport), admits the first
    /// batch and returns the loaded points in input order.
    pub fn update(
        &mut self,
        points: &[GeoPoint],
        viewport: &Viewport,
        user_location: Option<Coordinate>,
        now: Instant,
    ) -> Vec<GeoPoint> {
        if self.disposed {
            tracing::debug!("Admission update ignored after dispose");
            return Vec::new();
        }

        let distances: HashMap<&str, f64> = points
            .iter()
            .map(|p| (p.id.as_str(), normalized_distance(p.coordinate(), viewport)))
            .collect();

        // Evict synchronously: left the unload band, or no longer listed.
        let evict: HashSet<String> = self
            .state
            .loaded
            .iter()
            .filter(|id| {
                distances
                    .get(id.as_str())
                    .map_or(true, |&d| d > self.config.unload_threshold)
            })
            .cloned()
            .collect();
        if !evict.is_empty() {
            self.state.remove(&evict);
            self.metrics.evicted_out_of_band(evict.len());
            tracing::debug!(evicted = evict.len(), "Evicted points outside unload band");
        }

        // Queue unloaded points inside the load band, most important first.
        // A repeated id is queued once, for its first occurrence.
        let mut queued = HashSet::new();
        let candidates: Vec<GeoPoint> = points
            .iter()
            .filter(|p| !self.state.is_loaded(&p.id))
            .filter(|p| distances[p.id.as_str()] <= self.config.load_threshold)
            .filter(|p| queued.insert(p.id.as_str()))
            .cloned()
            .collect();
        let order = rank_by_priority(&candidates, user_location);
        self.state.pending_queue = order
            .into_iter()
            .map(|i| candidates[i].id.clone())
            .collect();
        self.next_tick = None;

        self.admit_batch(now);
        self.loaded_points(points)
    }

    /// Admits the next batch if a tick is due at `now`.
    ///
    /// Returns the number of points admitted.
    pub fn tick(&mut self, now: Instant) -> usize {
        match self.next_tick {
            Some(due) if !self.disposed && now >= due => {
                self.metrics.admission_tick();
                self.admit_batch(now)
            }
            _ => 0,
        }
    }

    /// Filters `points` to the loaded ones, preserving input order.
    pub fn loaded_points(&self, points: &[GeoPoint]) -> Vec<GeoPoint> {
        points
            .iter()
            .filter(|p| self.state.is_loaded(&p.id))
            .cloned()
            .collect()
    }

    /// Drops the pending queue and its scheduled tick.
    ///
    /// Called when a newer viewport supersedes the one the queue was built
    /// for; the loaded set is left alone.
    pub fn cancel_pending(&mut self) {
        if self.has_pending() {
            tracing::debug!(
                pending = self.state.pending_len(),
                "Cancelled pending admission batch"
            );
        }
        self.state.pending_queue.clear();
        self.next_tick = None;
    }

    /// Clears all state; the controller stays usable.
    pub fn reset(&mut self) {
        self.state.clear();
        self.next_tick = None;
    }

    /// Cancels any scheduled tick and clears all state for good.
    ///
    /// Later `update` and `tick` calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.reset();
        self.disposed = true;
        tracing::debug!("Admission controller disposed");
    }

    fn admit_batch(&mut self, now: Instant) -> usize {
        let max_loaded = self.config.max_loaded;
        let take = self.config.batch_size.min(max_loaded);

        let mut batch = Vec::with_capacity(take);
        let mut in_batch = HashSet::with_capacity(take);
        while batch.len() < take {
            let Some(id) = self.state.pending_queue.pop_front() else {
                break;
            };
            if !self.state.is_loaded(&id) && in_batch.insert(id.clone()) {
                batch.push(id);
            }
        }

        let overflow = (self.state.loaded.len() + batch.len()).saturating_sub(max_loaded);
        if overflow > 0 {
            for _ in 0..overflow {
                if let Some(oldest) = self.state.admission_order.pop_front() {
                    self.state.loaded.remove(&oldest);
                }
            }
            self.metrics.evicted_capacity(overflow);
            tracing::debug!(
                overflow,
                max_loaded,
                "Capacity exceeded, evicted oldest admitted points"
            );
        }

        let admitted = batch.len();
        for id in batch {
            self.state.loaded.insert(id.clone());
            self.state.admission_order.push_back(id);
        }
        if admitted > 0 {
            self.metrics.admitted(admitted);
        }

        self.next_tick = if self.state.pending_queue.is_empty() {
            None
        } else {
            Some(now + self.config.tick_interval)
        };

        admitted
    }
}
