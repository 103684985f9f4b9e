//! Greedy single-pass pixel-radius clusterer.

use std::sync::Arc;

use crate::geo::{pixel_distance, project_to_pixels, ScreenSize, Viewport};
use crate::listing::GeoPoint;
use crate::telemetry::EngineMetrics;

use super::types::{Cluster, ClusterOptions, ClusterOutput};

/// Groups nearby points into clusters for one viewport and zoom.
///
/// # Algorithm
///
/// 1. At `zoom >= max_zoom`, or with fewer than `min_points` points, every
///    point is a single.
/// 2. Points are visited in input order. The first unvisited point seeds a
///    group; every later unvisited point within `radius_px` of the seed (in
///    projected pixels) joins it and is marked visited.
/// 3. A group of at least `min_points` becomes a [`Cluster`]; a smaller group
///    is emitted as singles.
///
/// The scan is O(n²) per pass. Callers bound `n` upstream (viewport budget
/// or admission capacity), which keeps a pass to a few hundred points.
/// Identical input order yields identical output.
#[derive(Debug, Clone)]
pub struct SpatialClusterer {
    options: ClusterOptions,
    screen: ScreenSize,
    metrics: Option<Arc<EngineMetrics>>,
}

impl SpatialClusterer {
    /// Creates a clusterer for the given options and screen size.
    pub fn new(options: ClusterOptions, screen: ScreenSize) -> Self {
        Self {
            options,
            screen,
            metrics: None,
        }
    }

    /// Creates a clusterer with default options and screen size.
    pub fn with_defaults() -> Self {
        Self::new(ClusterOptions::default(), ScreenSize::default())
    }

    /// Records clustering passes in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Options in use.
    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Clusters `points` as seen through `viewport` at `zoom`.
    pub fn cluster(&self, points: &[GeoPoint], viewport: &Viewport, zoom: i32) -> ClusterOutput {
        let output = cluster_points(points, viewport, zoom, &self.options, self.screen);

        if let Some(metrics) = &self.metrics {
            metrics.cluster_pass(output.clusters.len());
        }
        tracing::debug!(
            points = points.len(),
            zoom,
            clusters = output.clusters.len(),
            singles = output.singles.len(),
            "Clustering pass complete"
        );

        output
    }
}

/// Stateless clustering pass; see [`SpatialClusterer`] for the algorithm.
pub fn cluster_points(
    points: &[GeoPoint],
    viewport: &Viewport,
    zoom: i32,
    options: &ClusterOptions,
    screen: ScreenSize,
) -> ClusterOutput {
    if zoom >= options.max_zoom || points.len() < options.min_points {
        return ClusterOutput::all_singles(points);
    }

    let pixels: Vec<(f64, f64)> = points
        .iter()
        .map(|p| project_to_pixels(p.coordinate(), viewport, screen))
        .collect();

    let mut visited = vec![false; points.len()];
    let mut output = ClusterOutput::default();
    let mut group: Vec<usize> = Vec::new();

    for seed in 0..points.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        group.clear();
        group.push(seed);

        for candidate in (seed + 1)..points.len() {
            if visited[candidate] {
                continue;
            }
            if pixel_distance(pixels[seed], pixels[candidate]) <= options.radius_px {
                visited[candidate] = true;
                group.push(candidate);
            }
        }

        if group.len() >= options.min_points {
            let members: Vec<&GeoPoint> = group.iter().map(|&i| &points[i]).collect();
            output.clusters.push(Cluster::from_members(&members));
        } else {
            output
                .singles
                .extend(group.iter().map(|&i| points[i].clone()));
        }
    }

    output
}
