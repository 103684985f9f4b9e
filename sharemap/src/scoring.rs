//! Listing priority score.
//!
//! Used to rank listings whenever not all of them can be shown: the viewport
//! selector truncates by it and the admission controller orders its queue by
//! it. Higher scores are more important.
//!
//! ```text
//! score = distance + availability + urgency + rating + verified
//!
//! distance      max(0, 10 - km to user)   (0 without a user location)
//! availability  High = 5, Medium = 3, Low = 1
//! urgency       8 if urgent
//! rating        rating in [0, 5]          (0 if unrated)
//! verified      2 if verified
//! ```

use std::cmp::Ordering;

use crate::geo::{haversine_distance_km, Coordinate};
use crate::listing::{Availability, GeoPoint};

/// Distance (km) at which the distance term reaches zero.
pub const DISTANCE_HORIZON_KM: f64 = 10.0;

/// Bonus for urgent listings.
pub const URGENCY_BONUS: f64 = 8.0;

/// Bonus for verified sharers.
pub const VERIFIED_BONUS: f64 = 2.0;

/// Availability contribution to the score.
pub fn availability_weight(availability: Availability) -> f64 {
    match availability {
        Availability::High => 5.0,
        Availability::Medium => 3.0,
        Availability::Low => 1.0,
    }
}

/// Priority score of a point, optionally relative to the user's location.
pub fn priority_score(point: &GeoPoint, user_location: Option<Coordinate>) -> f64 {
    let distance = user_location
        .map(|user| (DISTANCE_HORIZON_KM - haversine_distance_km(user, point.coordinate())).max(0.0))
        .unwrap_or(0.0);
    let urgency = if point.is_urgent { URGENCY_BONUS } else { 0.0 };
    let rating = point.rating.unwrap_or(0.0);
    let verified = if point.is_verified { VERIFIED_BONUS } else { 0.0 };

    distance + availability_weight(point.availability) + urgency + rating + verified
}

/// Stable ordering of points by descending score.
///
/// Returns the indices of `points` sorted so the highest score comes first;
/// equal scores keep input order.
pub fn rank_by_priority(points: &[GeoPoint], user_location: Option<Coordinate>) -> Vec<usize> {
    let scores: Vec<f64> = points
        .iter()
        .map(|p| priority_score(p, user_location))
        .collect();
    let mut order: Vec<usize> = (0..points.len()).collect();
    // sort_by is stable, so ties keep input order
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}
