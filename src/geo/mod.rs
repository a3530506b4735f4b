//! Geodesy for transmission lines on the map.
//!
//! A [`GeodesyService`] solves the direct and inverse geodesic problems;
//! [`geodesic_path`] samples a path between two points and splits it into
//! several polylines wherever it crosses the antimeridian.

mod vincenty;

use std::fmt;

use color_eyre::eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

pub use vincenty::Vincenty;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Result of the inverse problem. Bearings are degrees in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverseSolution {
    /// Metres, rounded to the millimetre.
    pub distance: f64,
    pub initial_bearing: f64,
    pub final_bearing: f64,
}

/// Solver for geodesics on some earth model.
pub trait GeodesyService {
    /// Point reached from `start` after `distance` metres along `bearing` degrees.
    /// Longitudes are normalised to `[-180, 180)`.
    fn direct_path(&self, start: LatLng, bearing: f64, distance: f64) -> LatLng;

    /// Distance and bearings between two points.
    fn inverse_path(&self, p1: LatLng, p2: LatLng) -> Result<InverseSolution>;
}

/// Sample the geodesic from `start` to `end` in `steps` equal segments.
///
/// Returns one polyline, or more when the path wraps across the
/// antimeridian. At each crossing the current polyline ends on the edge of
/// the map and the next one starts on the opposite edge at the same latitude.
pub fn geodesic_path(
    service: &dyn GeodesyService,
    start: LatLng,
    end: LatLng,
    steps: usize,
) -> Result<Vec<Vec<LatLng>>> {
    if steps == 0 {
        return Err(eyre!("geodesic path needs at least one step"));
    }
    let inverse = service.inverse_path(start, end)?;

    let mut lines = vec![vec![start]];
    let mut prev = start;
    for step in 1..=steps {
        let along = inverse.distance * step as f64 / steps as f64;
        let point = service.direct_path(start, inverse.initial_bearing, along);

        if (point.lng - prev.lng).abs() > 180.0 {
            let edge = if point.lng < prev.lng { 180.0 } else { -180.0 };
            // unwrap the next longitude onto the same side as `prev`
            let unwrapped = point.lng + 2.0 * edge;
            let t = (edge - prev.lng) / (unwrapped - prev.lng);
            let lat = prev.lat + t * (point.lat - prev.lat);

            if let Some(line) = lines.last_mut() {
                line.push(LatLng::new(lat, edge));
            }
            lines.push(vec![LatLng::new(lat, -edge)]);
        }

        if let Some(line) = lines.last_mut() {
            line.push(point);
        }
        prev = point;
    }

    log::debug!(
        "geodesic {start} -> {end}: {:.0} m in {} polyline(s)",
        inverse.distance,
        lines.len()
    );
    Ok(lines)
}
