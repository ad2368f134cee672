//! # Orbit geometry helpers
//!
//! Small, allocation-free building blocks shared by the objectives and the perturbation tools:
//!
//! - [`shortest_angle`] – signed angular difference wrapped into `(-180°, 180°]`.
//! - [`ra_dec_to_look_vector`] – unit line-of-sight from right ascension and declination.
//! - [`UvwFrame`] – radial / along-track / cross-track frame built from a state vector.
//! - [`RicFrame`] – radial / in-track / cross-track frame used to perturb velocities.
//! - [`plane_intersection_range`] – range along a look ray to the satellite's orbit plane.
//! - [`uvw_position_residuals`] – observed-minus-computed positions expressed in [`UvwFrame`].
//!
//! All vectors are expressed in the same inertial frame (TEME for propagated states) and in
//! kilometers, kilometers per second, or unitless for directions.

use log::warn;
use nalgebra::Vector3;

use crate::astrolib::EpochState;
use crate::constants::{Degree, Kilometer, RADEG};
use crate::fit_errors::FitError;
use crate::observations::PreparedObservation;

/// Below this value of `|L̂·n̂|` the look ray is considered parallel to the orbit plane.
pub const PLANE_INTERSECTION_MIN_DENOMINATOR: f64 = 1.0e-9;

/// Signed difference `a - b` between two angles in degrees, wrapped into `(-180, 180]`.
///
/// Arguments
/// ---------
/// * `a`, `b`: angles in degrees, any range
///
/// Return
/// ------
/// * `((a - b + 180) mod 360) - 180`, with an exact `-180` reported as `+180`
pub fn shortest_angle(a: Degree, b: Degree) -> Degree {
    let d = (a - b + 180.0).rem_euclid(360.0) - 180.0;
    if d <= -180.0 {
        d + 360.0
    } else {
        d
    }
}

/// Unit line-of-sight vector `(cos δ cos α, cos δ sin α, sin δ)` from angles in degrees.
pub fn ra_dec_to_look_vector(right_ascension: Degree, declination: Degree) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (right_ascension * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (declination * RADEG).sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Radial / along-track / cross-track unit triad.
///
/// * `u = r / |r|`
/// * `w = (r × v) / |r × v|`
/// * `v = w × u`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvwFrame {
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    pub w: Vector3<f64>,
}

impl UvwFrame {
    pub fn from_state(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Self {
        let u = position.normalize();
        let w = position.cross(velocity).normalize();
        let v = w.cross(&u);
        UvwFrame { u, v, w }
    }

    /// Components of `vector` along `(u, v, w)`.
    pub fn project(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(self.u.dot(vector), self.v.dot(vector), self.w.dot(vector))
    }
}

/// Radial / in-track / cross-track triad as used for velocity perturbations.
///
/// * `radial = r / |r|`
/// * `in_track = v / |v|`
/// * `cross_track = in_track × radial`
///
/// For non-circular orbits `in_track` is not orthogonal to `radial`; the triad follows the
/// velocity direction rather than the orthogonalized along-track axis of [`UvwFrame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RicFrame {
    pub radial: Vector3<f64>,
    pub in_track: Vector3<f64>,
    pub cross_track: Vector3<f64>,
}

impl RicFrame {
    pub fn from_state(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Self {
        let radial = position.normalize();
        let in_track = velocity.normalize();
        let cross_track = in_track.cross(&radial);
        RicFrame {
            radial,
            in_track,
            cross_track,
        }
    }

    /// Velocity after adding `ric = (r, i, c)` (km/s) along the triad axes.
    pub fn perturb_velocity(&self, velocity: &Vector3<f64>, ric: &Vector3<f64>) -> Vector3<f64> {
        velocity + self.radial * ric.x + self.in_track * ric.y + self.cross_track * ric.z
    }
}

/// Unit normal of the orbit plane, `(r × v) / |r × v|`.
pub fn orbit_normal(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector3<f64> {
    position.cross(velocity).normalize()
}

/// Range from a sensor to the orbit plane along a unit look ray.
///
/// The orbit plane passes through the Earth's center with unit normal `n̂`. The ray
/// `S + t·L̂` meets it at `t = -(n̂·S) / (n̂·L̂)`.
///
/// Arguments
/// ---------
/// * `normal`: unit orbit normal
/// * `sensor`: sensor position (km)
/// * `look`: unit look vector
///
/// Return
/// ------
/// * the range `t` in km. It may be negative when the plane lies behind the sensor.
/// * [`FitError::DegeneratePlaneIntersection`] when `|n̂·L̂|` is below
///   [`PLANE_INTERSECTION_MIN_DENOMINATOR`]
pub fn plane_intersection_range(
    normal: &Vector3<f64>,
    sensor: &Vector3<f64>,
    look: &Vector3<f64>,
) -> Result<Kilometer, FitError> {
    let denominator = normal.dot(look);
    if !(denominator.abs() >= PLANE_INTERSECTION_MIN_DENOMINATOR) {
        return Err(FitError::DegeneratePlaneIntersection { denominator });
    }
    Ok(-normal.dot(sensor) / denominator)
}

/// Plane-intersection ranges for a batch of observations against matching propagated states.
///
/// Each observation is paired with the state at the same index. Degenerate geometries yield
/// `NaN` and are logged.
pub fn plane_intersection_ranges(
    states: &[EpochState],
    observations: &[PreparedObservation],
) -> Vec<Kilometer> {
    states
        .iter()
        .zip(observations)
        .map(|(state, obs)| {
            let normal = orbit_normal(&state.position, &state.velocity);
            match plane_intersection_range(&normal, &obs.sensor.position, &obs.look_vector) {
                Ok(range) => range,
                Err(e) => {
                    warn!("plane intersection at ds50 {:.6}: {e}", obs.ds50_utc);
                    f64::NAN
                }
            }
        })
        .collect()
}

/// Observed minus computed positions in the UVW frame of each computed state.
///
/// The observed position is taken where the look ray crosses the computed orbit plane, so the
/// `w` component is zero up to rounding and the residual reads as radial (`u`) and along-track
/// (`v`) error. Samples with degenerate geometry give `None`.
pub fn uvw_position_residuals(
    states: &[EpochState],
    observations: &[PreparedObservation],
) -> Vec<Option<Vector3<f64>>> {
    plane_intersection_ranges(states, observations)
        .into_iter()
        .zip(states.iter().zip(observations))
        .map(|(range, (state, obs))| {
            if !range.is_finite() {
                return None;
            }
            let observed = obs.sensor.position + obs.look_vector * range;
            let frame = UvwFrame::from_state(&state.position, &state.velocity);
            Some(frame.project(&(observed - state.position)))
        })
        .collect()
}

#[cfg(test)]
mod geometry_test {
    use super::*;
    use crate::astrolib::{GeodeticSite, SensorState};
    use crate::observations::Observation;
    use crate::time::ds50_to_epoch;
    use approx::assert_relative_eq;

    fn observation_from(sensor: Vector3<f64>, look: Vector3<f64>) -> PreparedObservation {
        let site = GeodeticSite {
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
        };
        PreparedObservation {
            observation: Observation::new(ds50_to_epoch(27000.0), site, 0.0, 0.0),
            ds50_utc: 27000.0,
            theta: 0.0,
            right_ascension: 0.0,
            declination: 0.0,
            look_vector: look.normalize(),
            sensor: SensorState {
                ds50_utc: 27000.0,
                site,
                theta: 0.0,
                position: sensor,
            },
        }
    }

    #[test]
    fn test_shortest_angle() {
        assert_eq!(shortest_angle(359.0, 1.0), -2.0);
        assert_eq!(shortest_angle(1.0, 359.0), 2.0);
        assert_eq!(shortest_angle(10.0, 10.0), 0.0);
        assert_eq!(shortest_angle(180.0, 0.0), 180.0);
        assert_eq!(shortest_angle(0.0, 180.0), 180.0);
        assert_relative_eq!(shortest_angle(-725.0, 10.0), -15.0, epsilon = 1e-12);
        assert_relative_eq!(shortest_angle(90.5, -90.0), 180.5 - 360.0, epsilon = 1e-12);
    }

    #[test]
    fn test_look_vector() {
        let l = ra_dec_to_look_vector(90.0, 0.0);
        assert_relative_eq!(l, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-15);

        let l = ra_dec_to_look_vector(123.0, -45.0);
        assert_relative_eq!(l.norm(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(l.z, -(0.5f64).sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_frames() {
        let r = Vector3::new(7000.0, 0.0, 0.0);
        let v = Vector3::new(0.5, 7.5, 0.0);

        let uvw = UvwFrame::from_state(&r, &v);
        assert_relative_eq!(uvw.u, Vector3::x(), epsilon = 1e-15);
        assert_relative_eq!(uvw.v, Vector3::y(), epsilon = 1e-15);
        assert_relative_eq!(uvw.w, Vector3::z(), epsilon = 1e-15);
        assert_relative_eq!(
            uvw.project(&Vector3::new(1.0, 2.0, 3.0)),
            Vector3::new(1.0, 2.0, 3.0),
            epsilon = 1e-15
        );

        let ric = RicFrame::from_state(&r, &v);
        assert_relative_eq!(ric.in_track, v.normalize(), epsilon = 1e-15);
        // in_track × radial points along -z for a prograde equatorial orbit
        assert!(ric.cross_track.z < 0.0);

        let v2 = ric.perturb_velocity(&v, &Vector3::zeros());
        assert_eq!(v2, v);
    }

    #[test]
    fn test_plane_intersection() {
        // orbit plane z = 0
        let target = Vector3::new(7000.0, 0.0, 0.0);
        let normal = orbit_normal(&target, &Vector3::new(0.0, 7.5, 0.0));
        let sensor = Vector3::new(6378.0, 0.0, -500.0);
        let look = (target - sensor).normalize();

        let range = plane_intersection_range(&normal, &sensor, &look).unwrap();
        assert_relative_eq!(range, (target - sensor).norm(), max_relative = 1e-12);

        let sensor_in_plane = Vector3::new(6378.0, 0.0, 0.0);
        let look_in_plane = (target - sensor_in_plane).normalize();
        let err = plane_intersection_range(&normal, &sensor_in_plane, &look_in_plane);
        assert!(matches!(
            err,
            Err(FitError::DegeneratePlaneIntersection { .. })
        ));
    }

    #[test]
    fn test_batch_ranges_flag_degenerate_samples() {
        let target = Vector3::new(7000.0, 0.0, 0.0);
        let state = EpochState::new(27000.0, target, Vector3::new(0.0, 7.5, 0.0));
        let below = Vector3::new(6378.0, 0.0, -500.0);
        let in_plane = Vector3::new(6378.0, 0.0, 0.0);
        let observations = [
            observation_from(below, target - below),
            observation_from(in_plane, target - in_plane),
        ];

        let ranges = plane_intersection_ranges(&[state, state], &observations);
        assert_eq!(ranges.len(), 2);
        assert_relative_eq!(ranges[0], (target - below).norm(), max_relative = 1e-12);
        assert!(ranges[1].is_nan());

        let uvw = uvw_position_residuals(&[state, state], &observations);
        assert_relative_eq!(uvw[0].unwrap(), Vector3::zeros(), epsilon = 1e-9);
        assert_eq!(uvw[1], None);
    }

    #[test]
    fn test_uvw_residual_reads_along_track_error() {
        let computed = EpochState::new(
            27000.0,
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 7.5, 0.0),
        );
        let sensor = Vector3::new(6378.0, 0.0, -500.0);
        let observed = Vector3::new(7000.0, 10.0, 0.0);
        let residual = uvw_position_residuals(&[computed], &[observation_from(sensor, observed - sensor)]);

        assert_relative_eq!(residual[0].unwrap(), Vector3::new(0.0, 10.0, 0.0), epsilon = 1e-9);
    }
}
