//! Lazy, bounded admission of listings into the rendered set.
//!
//! When a region has more listings than can be drawn at once, the
//! [`AdmissionController`] keeps a working set of "loaded" points around the
//! viewport. Points near the center are admitted in small priority-ordered
//! batches across ticks; points that drift far away are evicted. Separate
//! load and unload thresholds form a hysteresis band so small pans do not
//! churn the set.
//!
//! ```text
//!            distance ≤ load            distance > unload
//!  Unloaded ──────────────▶ Queued ──▶ Loaded ──────────────▶ Unloaded
//!                           (per tick,             (immediate)
//!                            batch_size)
//! ```

mod config;
mod controller;

pub use config::{
    AdmissionConfig, DEFAULT_BATCH_SIZE, DEFAULT_LOAD_THRESHOLD, DEFAULT_MAX_LOADED,
    DEFAULT_TICK_INTERVAL, DEFAULT_UNLOAD_THRESHOLD,
};
pub use controller::{normalized_distance, AdmissionController, AdmissionState};
