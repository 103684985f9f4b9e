//! Geographic value types: coordinates, viewports and bounds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised when a coordinate fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude or longitude is NaN or infinite.
    #[error("Coordinate is not finite: ({lat}, {lon})")]
    NonFinite { lat: f64, lon: f64 },

    /// Latitude outside [-90, 90].
    #[error("Invalid latitude: {0} (must be between {MIN_LAT} and {MAX_LAT})")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be between {MIN_LON} and {MAX_LON})")]
    InvalidLongitude(f64),
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate without validating it.
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that both components are finite and within range.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CoordError::NonFinite {
                lat: self.latitude,
                lon: self.longitude,
            });
        }
        if !(MIN_LAT..=MAX_LAT).contains(&self.latitude) {
            return Err(CoordError::InvalidLatitude(self.latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&self.longitude) {
            return Err(CoordError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }

    /// Returns true if the coordinate passes [`Coordinate::validate`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// The visible map region: a center coordinate and a lat/lon span.
///
/// Viewports are plain values. A pan or zoom produces a new viewport;
/// nothing in the engine mutates one in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center latitude in degrees.
    pub center_lat: f64,
    /// Center longitude in degrees.
    pub center_lon: f64,
    /// Visible latitude extent in degrees.
    pub lat_span: f64,
    /// Visible longitude extent in degrees.
    pub lon_span: f64,
}

impl Viewport {
    /// Creates a viewport from its center and spans.
    pub fn new(center_lat: f64, center_lon: f64, lat_span: f64, lon_span: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            lat_span,
            lon_span,
        }
    }

    /// The viewport center as a coordinate.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_lat, self.center_lon)
    }

    /// Half of the latitude span (always non-negative).
    #[inline]
    pub fn half_lat_span(&self) -> f64 {
        self.lat_span.abs() / 2.0
    }

    /// Half of the longitude span (always non-negative).
    #[inline]
    pub fn half_lon_span(&self) -> f64 {
        self.lon_span.abs() / 2.0
    }

    /// Exact visible bounds (center ± span/2).
    pub fn bounds(&self) -> Bounds {
        self.buffered_bounds(0.0)
    }

    /// Bounds grown by `span * buffer_ratio` on every side.
    ///
    /// Bounds do not wrap across the antimeridian.
    pub fn buffered_bounds(&self, buffer_ratio: f64) -> Bounds {
        let ratio = if buffer_ratio.is_finite() {
            buffer_ratio.max(0.0)
        } else {
            0.0
        };
        let lat_extent = self.half_lat_span() + self.lat_span.abs() * ratio;
        let lon_extent = self.half_lon_span() + self.lon_span.abs() * ratio;
        Bounds {
            north: self.center_lat + lat_extent,
            south: self.center_lat - lat_extent,
            east: self.center_lon + lon_extent,
            west: self.center_lon - lon_extent,
        }
    }

    /// True if either span is zero or not finite.
    pub fn is_degenerate(&self) -> bool {
        !(self.lat_span.is_finite() && self.lon_span.is_finite())
            || self.lat_span == 0.0
            || self.lon_span == 0.0
    }

    /// True if every component differs from `other` by at most `epsilon`.
    pub fn is_within(&self, other: &Viewport, epsilon: f64) -> bool {
        (self.center_lat - other.center_lat).abs() <= epsilon
            && (self.center_lon - other.center_lon).abs() <= epsilon
            && (self.lat_span - other.lat_span).abs() <= epsilon
            && (self.lon_span - other.lon_span).abs() <= epsilon
    }

    /// Approximate zoom level for this viewport's latitude span.
    pub fn zoom_level(&self) -> i32 {
        super::zoom_level_from_span(self.lat_span)
    }
}

/// An axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Northern edge (maximum latitude).
    pub north: f64,
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
    /// Western edge (minimum longitude).
    pub west: f64,
}

impl Bounds {
    /// Inclusive containment test on both axes.
    #[inline]
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    /// Longitude extent in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

/// Size of the map widget in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl ScreenSize {
    /// Creates a screen size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The center pixel.
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        // Typical portrait phone viewport in logical pixels.
        Self::new(400.0, 800.0)
    }
}
