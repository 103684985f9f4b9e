//! Sharemap - marker clustering and viewport-adaptive rendering for shared
//! food listings.
//!
//! Given every listing in an area, the current map viewport and optionally
//! the user's location, the engine decides which listings to draw as pins,
//! which to merge into cluster markers, and which to keep loaded, while
//! keeping per-frame work bounded.
//!
//! # Architecture
//!
//! ```text
//!  listings ──▶ RenderStrategySelector ──┬─▶ ViewportSelector ─────────────┐
//!  viewport                              ├─▶ SpatialClusterer ─────────────┤
//!  user location                         ├─▶ ViewportSelector → Admission ─┼─▶ RenderPlan
//!                                        └─▶ Admission → SpatialClusterer ─┘
//!
//!  cluster taps ──▶ ClusterExpansionMachine ──▶ RenderPlan.expansion
//! ```
//!
//! [`MapSession`] wraps the pipeline with viewport debouncing, admission
//! ticks and expansion timing; [`session::spawn_session`] runs one on a
//! tokio task.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use sharemap::{EngineConfig, GeoPoint, MapSession, Viewport};
//!
//! let mut session = MapSession::new(&EngineConfig::default());
//! session.set_listings(vec![
//!     GeoPoint::new("bread", 51.5007, -0.1246),
//!     GeoPoint::new("apples", 51.5010, -0.1240),
//! ]);
//!
//! let plan = session
//!     .on_viewport_settled(Viewport::new(51.5, -0.124, 0.01, 0.01), Instant::now())
//!     .unwrap();
//! assert_eq!(plan.individuals.len(), 2);
//! ```

pub mod admission;
pub mod cluster;
pub mod config;
pub mod expansion;
pub mod geo;
pub mod listing;
pub mod logging;
pub mod render;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod strategy;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use geo::{Coordinate, Viewport};
pub use listing::{Availability, GeoPoint};
pub use render::{RenderPipeline, RenderPlan};
pub use session::MapSession;
pub use strategy::RenderStrategy;
