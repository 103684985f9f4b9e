//! Admission controller configuration.

use std::time::Duration;

/// Default normalized distance at or below which unloaded points are queued.
pub const DEFAULT_LOAD_THRESHOLD: f64 = 0.5;

/// Default normalized distance above which loaded points are evicted.
pub const DEFAULT_UNLOAD_THRESHOLD: f64 = 2.0;

/// Default capacity of the loaded set.
pub const DEFAULT_MAX_LOADED: usize = 200;

/// Default number of points admitted per tick.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default admission tick cadence (one display frame).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Configuration for the admission controller.
///
/// Distances are normalized so that `1.0` is one half-viewport from the
/// center on each axis. The gap between `load_threshold` and
/// `unload_threshold` is the hysteresis band: a point inside it keeps
/// whatever state it already has.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionConfig {
    /// Unloaded points at or below this distance are queued for admission.
    pub load_threshold: f64,

    /// Loaded points beyond this distance are evicted.
    ///
    /// Must be greater than `load_threshold`.
    pub unload_threshold: f64,

    /// Maximum size of the loaded set.
    pub max_loaded: usize,

    /// Maximum points admitted per tick.
    pub batch_size: usize,

    /// Delay between admission ticks while the queue is non-empty.
    pub tick_interval: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            load_threshold: DEFAULT_LOAD_THRESHOLD,
            unload_threshold: DEFAULT_UNLOAD_THRESHOLD,
            max_loaded: DEFAULT_MAX_LOADED,
            batch_size: DEFAULT_BATCH_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl AdmissionConfig {
    /// Sets both hysteresis thresholds.
    pub fn with_thresholds(mut self, load: f64, unload: f64) -> Self {
        self.load_threshold = load;
        self.unload_threshold = unload;
        self
    }

    /// Sets the loaded-set capacity.
    pub fn with_max_loaded(mut self, max_loaded: usize) -> Self {
        self.max_loaded = max_loaded;
        self
    }

    /// Sets the per-tick batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the tick cadence.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Whether the hysteresis band is well-formed.
    pub fn has_valid_band(&self) -> bool {
        self.load_threshold.is_finite()
            && self.unload_threshold.is_finite()
            && self.load_threshold >= 0.0
            && self.load_threshold < self.unload_threshold
    }
}
