//! Clustering options and results.

use serde::Serialize;

use crate::geo::Coordinate;
use crate::listing::GeoPoint;

/// Default merge radius in screen pixels.
pub const DEFAULT_RADIUS_PX: f64 = 60.0;

/// Default minimum group size for a cluster.
pub const DEFAULT_MIN_POINTS: usize = 2;

/// Default zoom level at and above which clustering is bypassed.
pub const DEFAULT_MAX_ZOOM: i32 = 16;

/// Tuning for the spatial clusterer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Points within this pixel distance of a seed join its group.
    pub radius_px: f64,

    /// Groups smaller than this are emitted as individual points.
    pub min_points: usize,

    /// At this zoom and above every point is emitted individually.
    ///
    /// At street level two nearby listings are distinct places the user
    /// wants to tap separately.
    pub max_zoom: i32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius_px: DEFAULT_RADIUS_PX,
            min_points: DEFAULT_MIN_POINTS,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ClusterOptions {
    /// Sets the merge radius.
    pub fn with_radius_px(mut self, radius_px: f64) -> Self {
        self.radius_px = radius_px;
        self
    }

    /// Sets the minimum cluster size.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Sets the bypass zoom.
    pub fn with_max_zoom(mut self, max_zoom: i32) -> Self {
        self.max_zoom = max_zoom;
        self
    }
}

/// A synthetic marker standing in for several nearby listings.
///
/// Clusters only exist for one clustering pass. `point_count` always equals
/// `member_ids().len()`; the clusterer never builds one smaller than its
/// `min_points`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    id: String,
    centroid: Coordinate,
    member_ids: Vec<String>,
    point_count: usize,
}

impl Cluster {
    /// Builds a cluster from its members; the first member is the seed.
    ///
    /// The id derives from the seed so it is stable while the seed keeps
    /// seeding the same group. The centroid is the unweighted mean of member
    /// coordinates.
    pub(crate) fn from_members(members: &[&GeoPoint]) -> Self {
        let count = members.len();
        let (lat_sum, lon_sum) = members
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.latitude, lon + p.longitude));
        let divisor = count.max(1) as f64;
        let id = members
            .first()
            .map(|seed| format!("cluster-{}", seed.id))
            .unwrap_or_else(|| "cluster-empty".to_string());

        Self {
            id,
            centroid: Coordinate::new(lat_sum / divisor, lon_sum / divisor),
            member_ids: members.iter().map(|p| p.id.clone()).collect(),
            point_count: count,
        }
    }

    /// Cluster identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mean position of the members.
    pub fn centroid(&self) -> Coordinate {
        self.centroid
    }

    /// Member listing ids, seed first.
    pub fn member_ids(&self) -> &[String] {
        &self.member_ids
    }

    /// Number of members.
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: &str) -> bool {
        self.member_ids.iter().any(|m| m == id)
    }
}

/// Result of one clustering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutput {
    /// Clusters in seed order.
    pub clusters: Vec<Cluster>,
    /// Points not merged into any cluster, in emission order.
    pub singles: Vec<GeoPoint>,
}

impl ClusterOutput {
    /// Every point emitted individually.
    pub fn all_singles(points: &[GeoPoint]) -> Self {
        Self {
            clusters: Vec::new(),
            singles: points.to_vec(),
        }
    }

    /// Total number of input points represented.
    pub fn represented_points(&self) -> usize {
        self.clusters.iter().map(Cluster::point_count).sum::<usize>() + self.singles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClusterOptions::default();
        assert_eq!(options.radius_px, DEFAULT_RADIUS_PX);
        assert_eq!(options.min_points, DEFAULT_MIN_POINTS);
        assert_eq!(options.max_zoom, DEFAULT_MAX_ZOOM);
    }

    #[test]
    fn test_cluster_from_members() {
        let a = GeoPoint::new("a", 1.0, 2.0);
        let b = GeoPoint::new("b", 3.0, 4.0);
        let cluster = Cluster::from_members(&[&a, &b]);

        assert_eq!(cluster.id(), "cluster-a");
        assert_eq!(cluster.point_count(), 2);
        assert_eq!(cluster.member_ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(cluster.centroid(), Coordinate::new(2.0, 3.0));
        assert!(cluster.contains("b"));
        assert!(!cluster.contains("c"));
    }

    #[test]
    fn test_cluster_serializes_camel_case() {
        let a = GeoPoint::new("a", 0.0, 0.0);
        let b = GeoPoint::new("b", 0.0, 0.0);
        let json = serde_json::to_value(Cluster::from_members(&[&a, &b])).unwrap();
        assert_eq!(json["pointCount"], 2);
        assert_eq!(json["memberIds"][1], "b");
    }
}
