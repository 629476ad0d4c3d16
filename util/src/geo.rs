//! Great-circle distance and geofence admission.
//!
//! Pure functions: no I/O, no validation of coordinate ranges (the session
//! registry validates geometry once, at creation time).

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Outcome of checking a point against a circular zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneCheck {
    /// Point is within the radius (boundary inclusive).
    Inside { distance_m: f64 },
    /// Point is outside the radius; `overage_m` is how far past the edge.
    Outside { distance_m: f64, overage_m: f64 },
}

impl ZoneCheck {
    pub fn is_inside(&self) -> bool {
        matches!(self, ZoneCheck::Inside { .. })
    }

    pub fn distance_m(&self) -> f64 {
        match *self {
            ZoneCheck::Inside { distance_m } | ZoneCheck::Outside { distance_m, .. } => distance_m,
        }
    }
}

/// Haversine distance between two coordinates, in meters.
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Checks whether `point` falls within `radius_m` meters of `center`.
///
/// A point exactly on the radius edge is in-zone.
pub fn check_zone(center: Coordinate, point: Coordinate, radius_m: f64) -> ZoneCheck {
    let distance_m = haversine_distance_m(center, point);
    if distance_m <= radius_m {
        ZoneCheck::Inside { distance_m }
    } else {
        ZoneCheck::Outside {
            distance_m,
            overage_m: distance_m - radius_m,
        }
    }
}
