//! Listings: the geo-tagged points the engine clusters and selects.
//!
//! Listings arrive from the backend as loosely typed JSON ([`RawListing`]).
//! They are validated once, here, into [`GeoPoint`]s with explicit scoring
//! attributes, so nothing downstream has to re-check a coordinate or guess at
//! a missing field.
//!
//! # Validation
//!
//! | Field | Rule |
//! |-------|------|
//! | `id` | non-empty after trimming |
//! | `latitude`/`longitude` | finite, within [-90, 90] / [-180, 180] |
//! | `availability` | `high`/`medium`/`low` (any case); missing or unknown → `Low` |
//! | `rating` | non-finite → `None`; otherwise clamped to [0, 5] |

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{CoordError, Coordinate};
use crate::telemetry::EngineMetrics;

/// Highest rating a listing can carry.
pub const MAX_RATING: f64 = 5.0;

/// How much of a listing is still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Plenty left.
    High,
    /// Some left.
    Medium,
    /// Little left, or unknown.
    Low,
}

impl Availability {
    /// Parses a backend availability string, case-insensitively.
    ///
    /// Unrecognized values map to `Low`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Availability::High,
            "medium" => Availability::Medium,
            _ => Availability::Low,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::High => "high",
            Availability::Medium => "medium",
            Availability::Low => "low",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated listing position with its scoring attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Listing identifier.
    pub id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Remaining availability.
    pub availability: Availability,
    /// Whether the listing expires soon.
    pub is_urgent: bool,
    /// Average rating in [0, 5], if rated.
    pub rating: Option<f64>,
    /// Whether the sharer is verified.
    pub is_verified: bool,
}

impl GeoPoint {
    /// Creates a point with neutral scoring attributes.
    ///
    /// The coordinate is not validated; use [`GeoPoint::try_from`] on a
    /// [`RawListing`] for untrusted input.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            availability: Availability::Low,
            is_urgent: false,
            rating: None,
            is_verified: false,
        }
    }

    /// Sets availability.
    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Marks the listing urgent.
    pub fn with_urgent(mut self, is_urgent: bool) -> Self {
        self.is_urgent = is_urgent;
        self
    }

    /// Sets the rating, applying the same sanitizing as ingestion.
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = sanitize_rating(Some(rating));
        self
    }

    /// Marks the sharer verified.
    pub fn with_verified(mut self, is_verified: bool) -> Self {
        self.is_verified = is_verified;
        self
    }

    /// Position of this listing.
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Listing as delivered by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    /// Listing identifier.
    pub id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Free-form availability string.
    #[serde(default)]
    pub availability: Option<String>,
    /// Urgency flag.
    #[serde(default)]
    pub is_urgent: Option<bool>,
    /// Rating, possibly missing.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Verification flag.
    #[serde(default)]
    pub is_verified: Option<bool>,
}

/// Reasons a listing is rejected at ingestion.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Coordinate failed validation.
    #[error("Listing {id:?} has an invalid coordinate: {source}")]
    InvalidCoordinate {
        id: String,
        #[source]
        source: CoordError,
    },

    /// Identifier is empty.
    #[error("Listing has an empty id")]
    EmptyId,

    /// The listings payload is not valid JSON.
    #[error("Invalid listings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TryFrom<RawListing> for GeoPoint {
    type Error = ListingError;

    fn try_from(raw: RawListing) -> Result<Self, Self::Error> {
        let id = raw.id.trim();
        if id.is_empty() {
            return Err(ListingError::EmptyId);
        }

        Coordinate::new(raw.latitude, raw.longitude)
            .validate()
            .map_err(|source| ListingError::InvalidCoordinate {
                id: id.to_string(),
                source,
            })?;

        Ok(GeoPoint {
            id: id.to_string(),
            latitude: raw.latitude,
            longitude: raw.longitude,
            availability: raw
                .availability
                .as_deref()
                .map(Availability::parse)
                .unwrap_or(Availability::Low),
            is_urgent: raw.is_urgent.unwrap_or(false),
            rating: sanitize_rating(raw.rating),
            is_verified: raw.is_verified.unwrap_or(false),
        })
    }
}

fn sanitize_rating(rating: Option<f64>) -> Option<f64> {
    rating
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, MAX_RATING))
}

/// Validates raw listings, dropping the ones that fail and any repeat of
/// an id already accepted.
///
/// Dropped listings are counted in `metrics` and never surface as errors:
/// a bad row from the backend means one fewer marker, not a failed render.
pub fn ingest<I>(raw: I, metrics: &Arc<EngineMetrics>) -> Vec<GeoPoint>
where
    I: IntoIterator<Item = RawListing>,
{
    let mut points = Vec::new();
    let mut seen = HashSet::new();
    let mut dropped = 0usize;

    for listing in raw {
        match GeoPoint::try_from(listing) {
            Ok(point) if !seen.insert(point.id.clone()) => {
                tracing::debug!(id = %point.id, "Dropping listing with duplicate id");
                metrics.invalid_listing();
                dropped += 1;
            }
            Ok(point) => points.push(point),
            Err(ListingError::InvalidCoordinate { id, source }) => {
                tracing::debug!(id = %id, error = %source, "Dropping listing with invalid coordinate");
                metrics.invalid_coordinate();
                dropped += 1;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Dropping invalid listing");
                metrics.invalid_listing();
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(
            dropped,
            accepted = points.len(),
            "Dropped invalid listings during ingestion"
        );
    }

    points
}

/// Parses a JSON array of listings and ingests it.
///
/// Only a malformed payload is an error; individual bad listings are
/// dropped as in [`ingest`].
pub fn listings_from_json(
    json: &str,
    metrics: &Arc<EngineMetrics>,
) -> Result<Vec<GeoPoint>, ListingError> {
    let raw: Vec<RawListing> = serde_json::from_str(json)?;
    Ok(ingest(raw, metrics))
}

/// Drops points with invalid coordinates, and repeats of an id already
/// seen, from an already-typed list. The first point with an id wins.
///
/// Used on the render path for points built with [`GeoPoint::new`], which
/// skips validation.
pub(crate) fn retain_valid(points: &[GeoPoint], metrics: &EngineMetrics) -> Vec<GeoPoint> {
    let mut seen = HashSet::new();
    points
        .iter()
        .filter(|p| {
            if !p.coordinate().is_valid() {
                metrics.invalid_coordinate();
                false
            } else if !seen.insert(p.id.as_str()) {
                metrics.invalid_listing();
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}

/// Whether every point has a valid coordinate and a distinct id.
pub(crate) fn all_valid_and_unique(points: &[GeoPoint]) -> bool {
    let mut seen = HashSet::with_capacity(points.len());
    points
        .iter()
        .all(|p| p.coordinate().is_valid() && seen.insert(p.id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, lat: f64, lon: f64) -> RawListing {
        RawListing {
            id: id.to_string(),
            latitude: lat,
            longitude: lon,
            ..Default::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Availability
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_availability_parse_is_case_insensitive() {
        assert_eq!(Availability::parse("HIGH"), Availability::High);
        assert_eq!(Availability::parse(" Medium "), Availability::Medium);
        assert_eq!(Availability::parse("low"), Availability::Low);
    }

    #[test]
    fn test_availability_unknown_is_low() {
        assert_eq!(Availability::parse("plenty"), Availability::Low);
        assert_eq!(Availability::parse(""), Availability::Low);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_try_from_applies_defaults() {
        let point = GeoPoint::try_from(raw("a", 51.5, -0.1)).unwrap();
        assert_eq!(point.id, "a");
        assert_eq!(point.availability, Availability::Low);
        assert!(!point.is_urgent);
        assert!(!point.is_verified);
        assert_eq!(point.rating, None);
    }

    #[test]
    fn test_try_from_rejects_invalid_coordinate() {
        let err = GeoPoint::try_from(raw("a", 95.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            ListingError::InvalidCoordinate {
                source: CoordError::InvalidLatitude(_),
                ..
            }
        ));
    }

    #[test]
    fn test_try_from_rejects_empty_id() {
        let err = GeoPoint::try_from(raw("  ", 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, ListingError::EmptyId));
    }

    #[test]
    fn test_rating_is_sanitized() {
        let mut listing = raw("a", 0.0, 0.0);
        listing.rating = Some(7.5);
        assert_eq!(GeoPoint::try_from(listing).unwrap().rating, Some(5.0));

        let mut listing = raw("b", 0.0, 0.0);
        listing.rating = Some(f64::NAN);
        assert_eq!(GeoPoint::try_from(listing).unwrap().rating, None);

        let mut listing = raw("c", 0.0, 0.0);
        listing.rating = Some(-1.0);
        assert_eq!(GeoPoint::try_from(listing).unwrap().rating, Some(0.0));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingestion
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_ingest_drops_and_counts_invalid() {
        let metrics = Arc::new(EngineMetrics::new());
        let points = ingest(
            vec![
                raw("ok", 10.0, 10.0),
                raw("nan", f64::NAN, 0.0),
                raw("far", 0.0, 200.0),
                raw("", 0.0, 0.0),
            ],
            &metrics,
        );

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, "ok");
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.invalid_coordinates, 2);
        assert_eq!(snapshot.invalid_listings, 1);
    }

    #[test]
    fn test_listings_from_json() {
        let metrics = Arc::new(EngineMetrics::new());
        let json = r#"[
            {"id": "1", "latitude": 51.5, "longitude": -0.12, "availability": "High",
             "isUrgent": true, "rating": 4.5, "isVerified": true},
            {"id": "2", "latitude": 51.6, "longitude": -0.13},
            {"id": "3", "latitude": 123.0, "longitude": 0.0}
        ]"#;

        let points = listings_from_json(json, &metrics).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].availability, Availability::High);
        assert!(points[0].is_urgent);
        assert!(points[0].is_verified);
        assert_eq!(points[0].rating, Some(4.5));
        assert_eq!(points[1].availability, Availability::Low);
        assert_eq!(metrics.snapshot().invalid_coordinates, 1);
    }

    #[test]
    fn test_listings_from_json_malformed_payload() {
        let metrics = Arc::new(EngineMetrics::new());
        let result = listings_from_json("{not json", &metrics);
        assert!(matches!(result, Err(ListingError::Json(_))));
    }

    #[test]
    fn test_retain_valid_filters_and_counts() {
        let metrics = EngineMetrics::new();
        let points = vec![
            GeoPoint::new("a", 0.0, 0.0),
            GeoPoint::new("b", f64::INFINITY, 0.0),
        ];
        let valid = retain_valid(&points, &metrics);
        assert_eq!(valid.len(), 1);
        assert_eq!(metrics.snapshot().invalid_coordinates, 1);
    }

    #[test]
    fn test_ingest_keeps_first_of_duplicate_ids() {
        let metrics = Arc::new(EngineMetrics::new());
        let points = ingest(
            vec![raw("x", 1.0, 1.0), raw("y", 2.0, 2.0), raw(" x ", 3.0, 3.0)],
            &metrics,
        );

        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(points[0].latitude, 1.0);
        assert_eq!(metrics.snapshot().invalid_listings, 1);
    }

    #[test]
    fn test_retain_valid_drops_duplicate_ids() {
        let metrics = EngineMetrics::new();
        let points = vec![
            GeoPoint::new("x", 0.0, 0.0),
            GeoPoint::new("x", 0.0, 0.0),
            GeoPoint::new("a", 0.0, 0.0),
        ];
        assert!(!all_valid_and_unique(&points));

        let valid = retain_valid(&points, &metrics);
        assert_eq!(valid.len(), 2);
        assert!(all_valid_and_unique(&valid));
        assert_eq!(metrics.snapshot().invalid_listings, 1);
    }
}
