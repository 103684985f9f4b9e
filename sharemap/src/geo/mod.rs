//! Coordinate distance and pixel-projection primitives.
//!
//! # Projection
//!
//! [`project_to_pixels`] is a plain equirectangular interpolation across the
//! viewport bounds. It applies no Mercator correction, so latitudes are
//! compressed slightly differently than on the map widget, increasingly so
//! towards the poles. At city scale the difference is well under a marker's
//! size and the engine only uses pixel positions to decide which markers
//! overlap, never to place them.

mod types;

pub use types::{
    Bounds, CoordError, Coordinate, ScreenSize, Viewport, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Highest zoom level returned by [`zoom_level_from_span`].
pub const MAX_ZOOM_LEVEL: i32 = 22;

/// Great-circle distance between two coordinates in kilometers.
///
/// The `asin` argument is clamped to `[-1, 1]` so rounding error on
/// antipodal inputs cannot produce NaN.
pub fn haversine_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().clamp(-1.0, 1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Projects a coordinate into screen pixels for the given viewport.
///
/// Longitude maps linearly from `[west, east]` to `[0, width]` and latitude
/// from `[north, south]` to `[0, height]`. An axis with a zero or non-finite
/// span projects to the center pixel on that axis.
pub fn project_to_pixels(point: Coordinate, viewport: &Viewport, screen: ScreenSize) -> (f64, f64) {
    let bounds = viewport.bounds();
    let (center_x, center_y) = screen.center();

    let width = bounds.width();
    let x = if width > 0.0 && width.is_finite() {
        (point.longitude - bounds.west) / width * screen.width
    } else {
        center_x
    };

    let height = bounds.height();
    let y = if height > 0.0 && height.is_finite() {
        (bounds.north - point.latitude) / height * screen.height
    } else {
        center_y
    };

    (x, y)
}

/// Euclidean distance between two pixel positions.
#[inline]
pub fn pixel_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Zoom level for a latitude span: `round(log2(360 / lat_span))`.
///
/// Smaller spans give higher zoom. The result is clamped to
/// `0..=MAX_ZOOM_LEVEL`; a zero or non-finite span is treated as fully
/// zoomed in.
pub fn zoom_level_from_span(lat_span: f64) -> i32 {
    let span = lat_span.abs();
    if span == 0.0 || !span.is_finite() {
        return MAX_ZOOM_LEVEL;
    }
    let zoom = (360.0 / span).log2().round();
    (zoom as i32).clamp(0, MAX_ZOOM_LEVEL)
}
