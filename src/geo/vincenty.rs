//! Vincenty direct and inverse solutions on the WGS-84 ellipsoid.

use color_eyre::eyre::{Result, eyre};

use super::{GeodesyService, InverseSolution, LatLng};

/// Semi-major axis in metres.
const WGS84_A: f64 = 6_378_137.0;
/// Semi-minor axis in metres.
const WGS84_B: f64 = 6_356_752.314245;
/// Flattening.
const WGS84_F: f64 = 1.0 / 298.257223563;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE: f64 = 1e-12;
/// Longitude nudge, in degrees, applied once when the inverse fails to converge.
const RETRY_NUDGE: f64 = 0.01;

/// Vincenty's formulae on an oblate ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vincenty {
    a: f64,
    b: f64,
    f: f64,
}

impl Vincenty {
    pub fn wgs84() -> Self {
        Self {
            a: WGS84_A,
            b: WGS84_B,
            f: WGS84_F,
        }
    }

    /// The series coefficients A and B for a given cos²α.
    fn coefficients(&self, cos_sq_alpha: f64) -> (f64, f64) {
        let u_sq = cos_sq_alpha * (self.a * self.a - self.b * self.b) / (self.b * self.b);
        let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        (big_a, big_b)
    }

    fn delta_sigma(big_b: f64, sin_sigma: f64, cos_sigma: f64, cos_2sigma_m: f64) -> f64 {
        let c2 = cos_2sigma_m * cos_2sigma_m;
        big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * c2)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * c2)))
    }

    /// One attempt at the inverse problem; `None` when λ does not converge.
    fn try_inverse(&self, p1: LatLng, p2: LatLng) -> Option<InverseSolution> {
        let f = self.f;
        let phi1 = p1.lat.to_radians();
        let phi2 = p2.lat.to_radians();
        let l = (p2.lng - p1.lng).to_radians();

        let tan_u1 = (1.0 - f) * phi1.tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;
        let tan_u2 = (1.0 - f) * phi2.tan();
        let cos_u2 = 1.0 / (1.0 + tan_u2 * tan_u2).sqrt();
        let sin_u2 = tan_u2 * cos_u2;

        let mut lambda = l;
        for _ in 0..MAX_ITERATIONS {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let cross = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            let sin_sigma = ((cos_u2 * sin_lambda).powi(2) + cross * cross).sqrt();
            if sin_sigma == 0.0 {
                return Some(InverseSolution {
                    distance: 0.0,
                    initial_bearing: 0.0,
                    final_bearing: 0.0,
                });
            }
            let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            let sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // equatorial line
            let cos_2sigma_m = if cos_sq_alpha == 0.0 {
                0.0
            } else {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if (lambda - previous).abs() <= CONVERGENCE {
                let (big_a, big_b) = self.coefficients(cos_sq_alpha);
                let delta = Self::delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
                let distance = self.b * big_a * (sigma - delta);

                let (sin_lambda, cos_lambda) = lambda.sin_cos();
                let forward =
                    (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
                let reverse =
                    (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

                return Some(InverseSolution {
                    distance: (distance * 1000.0).round() / 1000.0,
                    initial_bearing: normalise_bearing(forward.to_degrees()),
                    final_bearing: normalise_bearing(reverse.to_degrees()),
                });
            }
        }
        None
    }
}

impl Default for Vincenty {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl GeodesyService for Vincenty {
    fn direct_path(&self, start: LatLng, bearing: f64, distance: f64) -> LatLng {
        let (b, f) = (self.b, self.f);
        let phi1 = start.lat.to_radians();
        let lambda1 = start.lng.to_radians();
        let (sin_alpha1, cos_alpha1) = bearing.to_radians().sin_cos();

        let tan_u1 = (1.0 - f) * phi1.tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;
        let sigma1 = tan_u1.atan2(cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let (big_a, big_b) = self.coefficients(cos_sq_alpha);

        let mut sigma = distance / (b * big_a);
        let mut cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        for _ in 0..MAX_ITERATIONS {
            cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            let (sin_sigma, cos_sigma) = sigma.sin_cos();
            let previous = sigma;
            sigma = distance / (b * big_a)
                + Self::delta_sigma(big_b, sin_sigma, cos_sigma, cos_2sigma_m);
            if (sigma - previous).abs() <= CONVERGENCE {
                break;
            }
        }

        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let x = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let phi2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + x * x).sqrt());
        let lambda =
            (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
        let lambda2 = (lambda1 + l + 3.0 * std::f64::consts::PI)
            .rem_euclid(2.0 * std::f64::consts::PI)
            - std::f64::consts::PI;

        LatLng::new(phi2.to_degrees(), lambda2.to_degrees())
    }

    fn inverse_path(&self, p1: LatLng, p2: LatLng) -> Result<InverseSolution> {
        if let Some(solution) = self.try_inverse(p1, p2) {
            return Ok(solution);
        }
        log::warn!("vincenty inverse did not converge for {p1} -> {p2}, nudging target longitude");
        let nudged = LatLng::new(p2.lat, p2.lng - RETRY_NUDGE);
        self.try_inverse(p1, nudged)
            .ok_or_else(|| eyre!("vincenty inverse failed to converge for {p1} -> {p2}"))
    }
}

fn normalise_bearing(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLINDERS_PEAK: LatLng = LatLng {
        lat: -37.95103342,
        lng: 144.42486789,
    };
    const BUNINYONG: LatLng = LatLng {
        lat: -37.65282114,
        lng: 143.92649554,
    };

    #[test]
    fn test_inverse_flinders_peak_to_buninyong() {
        let solution = Vincenty::wgs84()
            .inverse_path(FLINDERS_PEAK, BUNINYONG)
            .unwrap();

        assert!((solution.distance - 54972.271).abs() < 1e-3);
        assert!((solution.initial_bearing - 306.86816).abs() < 1e-4);
    }

    #[test]
    fn test_direct_reaches_buninyong() {
        let end = Vincenty::wgs84().direct_path(FLINDERS_PEAK, 306.86816, 54972.271);

        assert!((end.lat - BUNINYONG.lat).abs() < 1e-6);
        assert!((end.lng - BUNINYONG.lng).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_points() {
        let solution = Vincenty::wgs84()
            .inverse_path(FLINDERS_PEAK, FLINDERS_PEAK)
            .unwrap();
        assert_eq!(solution.distance, 0.0);
    }

    #[test]
    fn test_bearing_is_normalised() {
        let solution = Vincenty::wgs84()
            .inverse_path(LatLng::new(0.0, 10.0), LatLng::new(0.0, 0.0))
            .unwrap();

        assert!((0.0..360.0).contains(&solution.initial_bearing));
        assert!((solution.initial_bearing - 270.0).abs() < 1e-9);
    }
}
