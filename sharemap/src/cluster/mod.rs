//! Spatial clustering of listings for a viewport.
//!
//! Nearby listings are merged into [`Cluster`] markers when the map is zoomed
//! out far enough that their pins would overlap. Distances are measured in
//! projected screen pixels, so the same two listings cluster at city zoom
//! and separate at street zoom.
//!
//! # Example
//!
//! ```
//! use sharemap::cluster::{ClusterOptions, SpatialClusterer};
//! use sharemap::geo::{ScreenSize, Viewport};
//! use sharemap::GeoPoint;
//!
//! let points = vec![
//!     GeoPoint::new("a", 0.0, 0.0),
//!     GeoPoint::new("b", 0.0, 0.0001),
//!     GeoPoint::new("c", 10.0, 10.0),
//! ];
//! let viewport = Viewport::new(5.0, 5.0, 11.25, 11.25);
//! let clusterer = SpatialClusterer::new(ClusterOptions::default(), ScreenSize::default());
//!
//! let output = clusterer.cluster(&points, &viewport, viewport.zoom_level());
//! assert_eq!(output.clusters.len(), 1);
//! assert_eq!(output.singles.len(), 1);
//! ```

mod clusterer;
mod types;

pub use clusterer::{cluster_points, SpatialClusterer};
pub use types::{
    Cluster, ClusterOptions, ClusterOutput, DEFAULT_MAX_ZOOM, DEFAULT_MIN_POINTS,
    DEFAULT_RADIUS_PX,
};
