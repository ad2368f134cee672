//! # Astrodynamics library interface
//!
//! The fit machinery never propagates orbits itself. It drives an external astrodynamics
//! library through the [`AstroLibrary`] trait, which mirrors the small set of services an
//! SGP4-class toolkit exposes:
//!
//! - load an element set (field array or two-line text) and obtain a satellite handle,
//! - initialize the propagator for that handle and propagate it to a ds50 time,
//! - convert a state vector to osculating elements and osculating to mean elements,
//! - convert between Kozai and Brouwer mean motion and between mean motion and semi-major axis,
//! - compute sensor positions and topocentric look angles,
//! - format and parse two-line element text.
//!
//! Libraries of this kind keep a process-wide table of loaded satellites, so at most one
//! element set is kept loaded at a time. [`PropagatorSlot`] enforces that discipline: every
//! evaluation clears the table, loads, initializes, uses and clears again, and exclusive
//! access (`&mut`) rules out concurrent use of the same library instance.
//!
//! [`SecularJ2`] is a self-contained implementation with a secular J2 theory, used by the
//! tests and benchmarks and as a reference for binding a production propagator.
//!
//! ## Units
//!
//! - Positions: **km**, velocities: **km/s** (TEME for propagated states)
//! - Angles: **degrees**
//! - Time: **ds50** (UTC days since 1950)
//! - Mean motion: **rev/day**

pub mod secular;
pub mod slot;
pub mod tle_text;

use nalgebra::Vector3;

use crate::constants::{Degree, Ds50, Kilometer, RevPerDay};
use crate::element_record::ElementRecord;
use crate::fit_errors::FitError;
use crate::geometry::shortest_angle;

pub use secular::SecularJ2;
pub use slot::PropagatorSlot;

/// Opaque handle of a satellite loaded into an [`AstroLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatHandle(pub u64);

/// Position and velocity at a ds50 (UTC) time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochState {
    pub ds50_utc: Ds50,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl EpochState {
    pub fn new(ds50_utc: Ds50, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        EpochState {
            ds50_utc,
            position,
            velocity,
        }
    }
}

/// Classical element set with the semi-major axis in kilometers and angles in degrees.
///
/// Used both for osculating elements (from a state vector) and for mean elements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeplerianSet {
    pub semi_major_axis: Kilometer,
    pub eccentricity: f64,
    pub inclination: Degree,
    pub node: Degree,
    pub arg_perigee: Degree,
    pub mean_anomaly: Degree,
}

impl KeplerianSet {
    /// Field-wise difference `self - other`, angular fields taken along the shortest arc.
    pub fn delta_from(&self, other: &KeplerianSet) -> KeplerianSet {
        KeplerianSet {
            semi_major_axis: self.semi_major_axis - other.semi_major_axis,
            eccentricity: self.eccentricity - other.eccentricity,
            inclination: shortest_angle(self.inclination, other.inclination),
            node: shortest_angle(self.node, other.node),
            arg_perigee: shortest_angle(self.arg_perigee, other.arg_perigee),
            mean_anomaly: shortest_angle(self.mean_anomaly, other.mean_anomaly),
        }
    }

    /// Field-wise average of a set of deltas.
    pub fn mean_of(sets: &[KeplerianSet]) -> KeplerianSet {
        let n = sets.len().max(1) as f64;
        sets.iter().fold(KeplerianSet::default(), |acc, s| KeplerianSet {
            semi_major_axis: acc.semi_major_axis + s.semi_major_axis / n,
            eccentricity: acc.eccentricity + s.eccentricity / n,
            inclination: acc.inclination + s.inclination / n,
            node: acc.node + s.node / n,
            arg_perigee: acc.arg_perigee + s.arg_perigee / n,
            mean_anomaly: acc.mean_anomaly + s.mean_anomaly / n,
        })
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.semi_major_axis,
            self.eccentricity,
            self.inclination,
            self.node,
            self.arg_perigee,
            self.mean_anomaly,
        ]
    }
}

/// Geodetic location of a ground sensor (WGS-84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticSite {
    pub latitude: Degree,
    pub longitude: Degree,
    pub height: Kilometer,
}

/// Inertial position of a sensor at a given time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorState {
    pub ds50_utc: Ds50,
    pub site: GeodeticSite,
    /// Greenwich mean sidereal time, radians
    pub theta: f64,
    pub position: Vector3<f64>,
}

/// Look angles from a sensor to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopoAngles {
    pub range: Kilometer,
    pub right_ascension: Degree,
    pub declination: Degree,
    pub azimuth: Degree,
    pub elevation: Degree,
}

/// Services required from an SGP4-class astrodynamics library.
///
/// Loading and propagation go through a [`SatHandle`]; everything else is stateless.
/// Implementations report failures as [`FitError::InvalidElementLoad`],
/// [`FitError::PropagatorInit`], [`FitError::Propagation`] or [`FitError::UnknownSatellite`].
pub trait AstroLibrary {
    /// Register an element set and return its handle.
    fn load(&mut self, record: &ElementRecord) -> Result<SatHandle, FitError>;

    /// Register an element set given as two-line text.
    fn load_lines(&mut self, line1: &str, line2: &str) -> Result<SatHandle, FitError> {
        let record = self.text_to_record(line1, line2)?;
        self.load(&record)
    }

    /// Forget every loaded satellite.
    fn clear_all(&mut self);

    /// Prepare a loaded satellite for propagation.
    fn init_propagation(&mut self, handle: SatHandle) -> Result<(), FitError>;

    /// Position (km) and velocity (km/s) in TEME at `ds50_utc`.
    fn propagate(
        &self,
        handle: SatHandle,
        ds50_utc: Ds50,
    ) -> Result<(Vector3<f64>, Vector3<f64>), FitError>;

    /// Osculating elements of a state vector.
    fn osculating_elements(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> KeplerianSet;

    /// Mean elements of the propagation theory for an osculating set.
    fn mean_elements(&self, osculating: &KeplerianSet) -> KeplerianSet;

    fn brouwer_to_kozai(
        &self,
        eccentricity: f64,
        inclination: Degree,
        brouwer: RevPerDay,
    ) -> RevPerDay;

    fn kozai_to_brouwer(
        &self,
        eccentricity: f64,
        inclination: Degree,
        kozai: RevPerDay,
    ) -> RevPerDay;

    fn semi_major_axis_to_mean_motion(&self, semi_major_axis: Kilometer) -> RevPerDay;

    fn mean_motion_to_semi_major_axis(&self, mean_motion: RevPerDay) -> Kilometer;

    /// Inertial position of a ground site at `ds50_utc`.
    fn sensor_state(&self, site: &GeodeticSite, ds50_utc: Ds50) -> SensorState;

    /// Look angles from `sensor` to a target state.
    fn topocentric_angles(
        &self,
        sensor: &SensorState,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> TopoAngles;

    /// Rotate J2000 right ascension / declination to the true-of-date (TEME) frame.
    fn rotate_ra_dec_to_date(
        &self,
        ds50_utc: Ds50,
        right_ascension: Degree,
        declination: Degree,
    ) -> (Degree, Degree);

    fn record_to_text(&self, record: &ElementRecord) -> Result<(String, String), FitError> {
        tle_text::format_tle(record)
    }

    fn text_to_record(&self, line1: &str, line2: &str) -> Result<ElementRecord, FitError> {
        tle_text::parse_tle(line1, line2)
    }
}

#[cfg(test)]
mod astrolib_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_delta_and_mean() {
        let a = KeplerianSet {
            semi_major_axis: 7000.0,
            eccentricity: 0.01,
            inclination: 51.0,
            node: 359.0,
            arg_perigee: 10.0,
            mean_anomaly: 0.5,
        };
        let b = KeplerianSet {
            node: 1.0,
            mean_anomaly: 359.5,
            ..a
        };

        let d = a.delta_from(&b);
        assert_eq!(d.semi_major_axis, 0.0);
        assert_eq!(d.node, -2.0);
        assert_eq!(d.mean_anomaly, 1.0);

        let m = KeplerianSet::mean_of(&[d, b.delta_from(&a)]);
        assert_relative_eq!(m.node, 0.0);
        assert_relative_eq!(m.mean_anomaly, 0.0);
    }
}
