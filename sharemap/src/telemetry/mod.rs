//! Engine telemetry for diagnostics.
//!
//! One [`EngineMetrics`] instance belongs to one map session. Components
//! receive it as an `Arc` at construction and bump lock-free counters; the
//! session takes a [`MetricsSnapshot`] when it is disposed and logs it.
//!
//! # Architecture
//!
//! ```text
//! Ingest / Selector / Clusterer ─┐
//! AdmissionController ───────────┼──► EngineMetrics ──► MetricsSnapshot ──► log / host
//! ExpansionMachine / Strategy ───┘   (atomic counters)   (point-in-time copy)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sharemap::telemetry::EngineMetrics;
//!
//! let metrics = Arc::new(EngineMetrics::new());
//! metrics.invalid_coordinate();
//! metrics.admitted(20);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.invalid_coordinates, 1);
//! assert_eq!(snapshot.admitted, 20);
//! ```

mod metrics;
mod snapshot;

pub use metrics::EngineMetrics;
pub use snapshot::MetricsSnapshot;
