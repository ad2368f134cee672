//! # Secular J2 reference library
//!
//! [`SecularJ2`] implements [`AstroLibrary`] with a deliberately small analytic theory:
//!
//! * two-body motion on the mean elements,
//! * secular J2 drift of the node, argument of perigee and mean anomaly,
//! * a quadratic along-track term standing in for drag. Types 0 and 2 derive it from `BStar`,
//!   type 4 from `NDot` plus `BTerm`; `AgomGp` has no effect.
//!
//! Mean elements are taken equal to osculating elements, the true-of-date frame equals J2000,
//! and Kozai/Brouwer mean motions follow the SGP4 initialization. Sensor sites sit on the
//! WGS-84 ellipsoid and rotate with Greenwich mean sidereal time.
//!
//! The theory is self-consistent: propagating an element set to its own epoch and converting
//! the state back yields the same elements, which is what the fit machinery relies on.

use nalgebra::Vector3;
use std::collections::HashMap;

use super::{
    AstroLibrary, GeodeticSite, KeplerianSet, SatHandle, SensorState, TopoAngles,
};
use crate::constants::{
    Degree, Ds50, Kilometer, Radian, RevPerDay, CK2, DPI, EARTH_RADIUS_KM, GM_EARTH, J2,
    MINUTES_PER_DAY, RADEG, SECONDS_PER_DAY, WGS84_FLATTENING, WGS84_MAJOR_AXIS_KM, XKE,
};
use crate::element_record::{ElementField, ElementRecord, EphemerisType, MeanMotionKind};
use crate::fit_errors::FitError;
use crate::time::gmst_ds50;

/// Along-track decay per unit `BStar` and mean motion, rev/day² per (1/ER · rev/day).
pub const BSTAR_DECAY_SCALE: f64 = 0.035;

/// Along-track decay per unit `BTerm` and mean motion, rev/day² per (m²/kg · rev/day).
pub const BTERM_DECAY_SCALE: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy)]
struct SecularModel {
    epoch: Ds50,
    semi_major_axis: Kilometer,
    eccentricity: f64,
    inclination: Radian,
    node: Radian,
    arg_perigee: Radian,
    mean_anomaly: Radian,
    /// rad/day
    node_rate: f64,
    arg_perigee_rate: f64,
    mean_anomaly_rate: f64,
    /// rad/day²
    decay: f64,
}

#[derive(Debug)]
struct LoadedSatellite {
    record: ElementRecord,
    model: Option<SecularModel>,
}

/// In-process astrodynamics library with a secular J2 theory.
#[derive(Debug, Default)]
pub struct SecularJ2 {
    satellites: HashMap<SatHandle, LoadedSatellite>,
    next_handle: u64,
}

impl SecularJ2 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of satellites currently loaded.
    pub fn loaded_count(&self) -> usize {
        self.satellites.len()
    }

    fn build_model(&self, record: &ElementRecord) -> Result<SecularModel, FitError> {
        let ecc = record[ElementField::Eccentricity];
        let incl = record[ElementField::Inclination];
        let mean_motion = record[ElementField::MeanMotion];

        if !(mean_motion > 0.0) {
            return Err(FitError::PropagatorInit(format!(
                "mean motion must be positive, got {mean_motion}"
            )));
        }
        if !(0.0..1.0).contains(&ecc) {
            return Err(FitError::PropagatorInit(format!(
                "eccentricity must lie in [0, 1), got {ecc}"
            )));
        }

        let brouwer = match record.ephemeris_type.mean_motion_kind() {
            MeanMotionKind::Kozai => self.kozai_to_brouwer(ecc, incl, mean_motion),
            MeanMotionKind::Brouwer => mean_motion,
        };
        if !(brouwer > 0.0) {
            return Err(FitError::PropagatorInit(format!(
                "invalid Brouwer mean motion {brouwer}"
            )));
        }

        let a = self.mean_motion_to_semi_major_axis(brouwer);
        let perigee = a * (1.0 - ecc);
        if perigee < EARTH_RADIUS_KM {
            return Err(FitError::PropagatorInit(format!(
                "perigee radius {perigee:.3} km is below the Earth's surface"
            )));
        }

        let n = brouwer * DPI;
        let i = incl * RADEG;
        let cos_i = i.cos();
        let beta2 = 1.0 - ecc * ecc;
        let p = a * beta2;
        let factor = J2 * (EARTH_RADIUS_KM / p).powi(2);

        let decay_rev = match record.ephemeris_type {
            EphemerisType::Type0 | EphemerisType::Type2 => {
                BSTAR_DECAY_SCALE * record[ElementField::BStar] * brouwer
            }
            EphemerisType::Type4 => {
                record[ElementField::NDot] + BTERM_DECAY_SCALE * record[ElementField::BTerm] * brouwer
            }
        };

        Ok(SecularModel {
            epoch: record.epoch(),
            semi_major_axis: a,
            eccentricity: ecc,
            inclination: i,
            node: record[ElementField::Node] * RADEG,
            arg_perigee: record[ElementField::ArgPerigee] * RADEG,
            mean_anomaly: record[ElementField::MeanAnomaly] * RADEG,
            node_rate: -1.5 * n * factor * cos_i,
            arg_perigee_rate: 0.75 * n * factor * (5.0 * cos_i * cos_i - 1.0),
            mean_anomaly_rate: n
                * (1.0 + 0.75 * factor * beta2.sqrt() * (3.0 * cos_i * cos_i - 1.0)),
            decay: DPI * decay_rev,
        })
    }
}

/// Solve Kepler's equation `E - e sin E = M` by Newton iterations.
fn eccentric_anomaly(mean_anomaly: Radian, ecc: f64) -> Radian {
    let m = mean_anomaly.rem_euclid(DPI);
    let mut e_anom = if ecc < 0.8 { m } else { std::f64::consts::PI };
    for _ in 0..50 {
        let delta = (e_anom - ecc * e_anom.sin() - m) / (1.0 - ecc * e_anom.cos());
        e_anom -= delta;
        if delta.abs() < 1e-15 {
            break;
        }
    }
    e_anom
}

/// Perifocal unit vectors P (towards perigee) and Q.
fn perifocal_axes(node: Radian, arg_perigee: Radian, inclination: Radian) -> (Vector3<f64>, Vector3<f64>) {
    let (sn, cn) = node.sin_cos();
    let (sw, cw) = arg_perigee.sin_cos();
    let (si, ci) = inclination.sin_cos();
    let p = Vector3::new(cn * cw - sn * sw * ci, sn * cw + cn * sw * ci, sw * si);
    let q = Vector3::new(-cn * sw - sn * cw * ci, -sn * sw + cn * cw * ci, cw * si);
    (p, q)
}

impl AstroLibrary for SecularJ2 {
    fn load(&mut self, record: &ElementRecord) -> Result<SatHandle, FitError> {
        if !record.is_finite() {
            return Err(FitError::InvalidElementLoad(format!(
                "element set {} has non-finite fields",
                record.sat_num
            )));
        }
        self.next_handle += 1;
        let handle = SatHandle(self.next_handle);
        self.satellites.insert(
            handle,
            LoadedSatellite {
                record: record.clone(),
                model: None,
            },
        );
        Ok(handle)
    }

    fn clear_all(&mut self) {
        self.satellites.clear();
    }

    fn init_propagation(&mut self, handle: SatHandle) -> Result<(), FitError> {
        let record = &self
            .satellites
            .get(&handle)
            .ok_or(FitError::UnknownSatellite(handle.0))?
            .record;
        let model = self.build_model(record)?;
        if let Some(sat) = self.satellites.get_mut(&handle) {
            sat.model = Some(model);
        }
        Ok(())
    }

    fn propagate(
        &self,
        handle: SatHandle,
        ds50_utc: Ds50,
    ) -> Result<(Vector3<f64>, Vector3<f64>), FitError> {
        let sat = self
            .satellites
            .get(&handle)
            .ok_or(FitError::UnknownSatellite(handle.0))?;
        let model = sat
            .model
            .as_ref()
            .ok_or_else(|| FitError::Propagation(format!("satellite {} not initialized", handle.0)))?;

        let dt = ds50_utc - model.epoch;
        let m = model.mean_anomaly + model.mean_anomaly_rate * dt + model.decay * dt * dt;
        let node = model.node + model.node_rate * dt;
        let arg_perigee = model.arg_perigee + model.arg_perigee_rate * dt;

        let a = model.semi_major_axis;
        let ecc = model.eccentricity;
        let e_anom = eccentric_anomaly(m, ecc);
        let (sin_e, cos_e) = e_anom.sin_cos();
        let beta = (1.0 - ecc * ecc).sqrt();
        let radius = a * (1.0 - ecc * cos_e);

        let x = a * (cos_e - ecc);
        let y = a * beta * sin_e;
        let speed_factor = (GM_EARTH * a).sqrt() / radius;
        let vx = -speed_factor * sin_e;
        let vy = speed_factor * beta * cos_e;

        let (p, q) = perifocal_axes(node, arg_perigee, model.inclination);
        let position = p * x + q * y;
        let velocity = p * vx + q * vy;

        if !(position.iter().all(|c| c.is_finite()) && velocity.iter().all(|c| c.is_finite())) {
            return Err(FitError::Propagation(format!(
                "non-finite state for satellite {} at ds50 {ds50_utc}",
                handle.0
            )));
        }
        Ok((position, velocity))
    }

    fn osculating_elements(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> KeplerianSet {
        let r = position.norm();
        let v2 = velocity.norm_squared();
        let h = position.cross(velocity);
        let hn = h.norm();

        let e_vec = (position * (v2 - GM_EARTH / r) - velocity * position.dot(velocity)) / GM_EARTH;
        let ecc = e_vec.norm();
        let a = 1.0 / (2.0 / r - v2 / GM_EARTH);
        let incl = (h.z / hn).clamp(-1.0, 1.0).acos();

        let node = if (h.x * h.x + h.y * h.y).sqrt() < 1e-12 * hn {
            0.0
        } else {
            h.x.atan2(-h.y)
        };
        let h_hat = h / hn;
        let n_hat = Vector3::new(node.cos(), node.sin(), 0.0);
        let m_hat = h_hat.cross(&n_hat);

        let arg_latitude = position.dot(&m_hat).atan2(position.dot(&n_hat));
        let (arg_perigee, true_anomaly) = if ecc < 1e-11 {
            (0.0, arg_latitude)
        } else {
            let w = e_vec.dot(&m_hat).atan2(e_vec.dot(&n_hat));
            (w, arg_latitude - w)
        };
        let beta = (1.0 - ecc * ecc).sqrt();
        let e_anom = (beta * true_anomaly.sin()).atan2(ecc + true_anomaly.cos());
        let mean_anomaly = e_anom - ecc * e_anom.sin();

        KeplerianSet {
            semi_major_axis: a,
            eccentricity: ecc,
            inclination: incl / RADEG,
            node: (node / RADEG).rem_euclid(360.0),
            arg_perigee: (arg_perigee / RADEG).rem_euclid(360.0),
            mean_anomaly: (mean_anomaly / RADEG).rem_euclid(360.0),
        }
    }

    fn mean_elements(&self, osculating: &KeplerianSet) -> KeplerianSet {
        *osculating
    }

    fn brouwer_to_kozai(&self, eccentricity: f64, inclination: Degree, brouwer: RevPerDay) -> RevPerDay {
        let mut kozai = brouwer;
        for _ in 0..100 {
            let estimate = self.kozai_to_brouwer(eccentricity, inclination, kozai);
            let next = kozai * brouwer / estimate;
            if !next.is_finite() {
                return f64::NAN;
            }
            let converged = (next - kozai).abs() <= 1e-15 * brouwer.abs();
            kozai = next;
            if converged {
                break;
            }
        }
        kozai
    }

    fn kozai_to_brouwer(&self, eccentricity: f64, inclination: Degree, kozai: RevPerDay) -> RevPerDay {
        let n = kozai * DPI / MINUTES_PER_DAY;
        let cos_i = (inclination * RADEG).cos();
        let x3thm1 = 3.0 * cos_i * cos_i - 1.0;
        let beta2 = 1.0 - eccentricity * eccentricity;
        let temp = 1.5 * CK2 * x3thm1 / (beta2.sqrt() * beta2);

        let a1 = (XKE / n).powf(2.0 / 3.0);
        let del1 = temp / (a1 * a1);
        let a0 = a1 * (1.0 - del1 * (1.0 / 3.0 + del1 * (1.0 + 134.0 / 81.0 * del1)));
        let del0 = temp / (a0 * a0);

        n / (1.0 + del0) * MINUTES_PER_DAY / DPI
    }

    fn semi_major_axis_to_mean_motion(&self, semi_major_axis: Kilometer) -> RevPerDay {
        (GM_EARTH / semi_major_axis.powi(3)).sqrt() * SECONDS_PER_DAY / DPI
    }

    fn mean_motion_to_semi_major_axis(&self, mean_motion: RevPerDay) -> Kilometer {
        let n = mean_motion * DPI / SECONDS_PER_DAY;
        (GM_EARTH / (n * n)).cbrt()
    }

    fn sensor_state(&self, site: &GeodeticSite, ds50_utc: Ds50) -> SensorState {
        let (sin_lat, cos_lat) = (site.latitude * RADEG).sin_cos();
        let (sin_lon, cos_lon) = (site.longitude * RADEG).sin_cos();
        let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
        let big_n = WGS84_MAJOR_AXIS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();

        let ecef = Vector3::new(
            (big_n + site.height) * cos_lat * cos_lon,
            (big_n + site.height) * cos_lat * sin_lon,
            (big_n * (1.0 - e2) + site.height) * sin_lat,
        );

        let theta = gmst_ds50(ds50_utc);
        let (sin_t, cos_t) = theta.sin_cos();
        let position = Vector3::new(
            ecef.x * cos_t - ecef.y * sin_t,
            ecef.x * sin_t + ecef.y * cos_t,
            ecef.z,
        );

        SensorState {
            ds50_utc,
            site: *site,
            theta,
            position,
        }
    }

    fn topocentric_angles(
        &self,
        sensor: &SensorState,
        position: &Vector3<f64>,
        _velocity: &Vector3<f64>,
    ) -> TopoAngles {
        let los = position - sensor.position;
        let range = los.norm();

        let right_ascension = los.y.atan2(los.x) / RADEG;
        let declination = (los.z / range).asin() / RADEG;

        let (sin_lat, cos_lat) = (sensor.site.latitude * RADEG).sin_cos();
        let lst = sensor.theta + sensor.site.longitude * RADEG;
        let (sin_lst, cos_lst) = lst.sin_cos();

        let south = sin_lat * cos_lst * los.x + sin_lat * sin_lst * los.y - cos_lat * los.z;
        let east = -sin_lst * los.x + cos_lst * los.y;
        let zenith = cos_lat * cos_lst * los.x + cos_lat * sin_lst * los.y + sin_lat * los.z;

        TopoAngles {
            range,
            right_ascension: right_ascension.rem_euclid(360.0),
            declination,
            azimuth: (east.atan2(-south) / RADEG).rem_euclid(360.0),
            elevation: (zenith / range).clamp(-1.0, 1.0).asin() / RADEG,
        }
    }

    fn rotate_ra_dec_to_date(
        &self,
        _ds50_utc: Ds50,
        right_ascension: Degree,
        declination: Degree,
    ) -> (Degree, Degree) {
        (right_ascension, declination)
    }
}

#[cfg(test)]
mod secular_test {
    use super::*;
    use approx::assert_relative_eq;

    fn circular_record() -> ElementRecord {
        let mut record = ElementRecord::new(11, EphemerisType::Type2);
        record[ElementField::Epoch] = 27000.0;
        record[ElementField::Inclination] = 51.6;
        record[ElementField::Node] = 300.0;
        record[ElementField::Eccentricity] = 0.001;
        record[ElementField::ArgPerigee] = 90.0;
        record[ElementField::MeanAnomaly] = 45.0;
        record[ElementField::MeanMotion] = 15.5;
        record
    }

    #[test]
    fn test_state_round_trip_at_epoch() {
        let mut lib = SecularJ2::new();
        let record = circular_record();
        let handle = lib.load(&record).unwrap();
        lib.init_propagation(handle).unwrap();

        let (r, v) = lib.propagate(handle, record.epoch()).unwrap();
        let osc = lib.osculating_elements(&r, &v);

        assert_relative_eq!(
            lib.semi_major_axis_to_mean_motion(osc.semi_major_axis),
            15.5,
            max_relative = 1e-12
        );
        assert_relative_eq!(osc.eccentricity, 0.001, epsilon = 1e-12);
        assert_relative_eq!(osc.inclination, 51.6, epsilon = 1e-9);
        assert_relative_eq!(osc.node, 300.0, epsilon = 1e-9);
        assert_relative_eq!(osc.arg_perigee, 90.0, epsilon = 1e-7);
        assert_relative_eq!(osc.mean_anomaly, 45.0, epsilon = 1e-7);
    }

    #[test]
    fn test_secular_node_regression() {
        let mut lib = SecularJ2::new();
        let record = circular_record();
        let handle = lib.load(&record).unwrap();
        lib.init_propagation(handle).unwrap();

        let (r, v) = lib.propagate(handle, record.epoch() + 1.0).unwrap();
        let osc = lib.osculating_elements(&r, &v);
        // a prograde LEO orbit regresses by a few degrees per day
        let drift = crate::geometry::shortest_angle(osc.node, 300.0);
        assert!(drift < -4.0 && drift > -6.0, "node drift {drift}");
    }

    #[test]
    fn test_mean_motion_conversions() {
        let lib = SecularJ2::new();
        let brouwer = lib.kozai_to_brouwer(0.0005853, 51.6404, 15.50482079);
        assert!(brouwer < 15.50482079 && brouwer > 15.49);

        let kozai = lib.brouwer_to_kozai(0.0005853, 51.6404, brouwer);
        assert_relative_eq!(kozai, 15.50482079, max_relative = 1e-13);

        let a = lib.mean_motion_to_semi_major_axis(15.5);
        assert_relative_eq!(lib.semi_major_axis_to_mean_motion(a), 15.5, max_relative = 1e-14);
    }

    #[test]
    fn test_load_and_init_errors() {
        let mut lib = SecularJ2::new();

        let mut record = circular_record();
        record[ElementField::Inclination] = f64::NAN;
        assert!(matches!(lib.load(&record), Err(FitError::InvalidElementLoad(_))));

        let mut record = circular_record();
        record[ElementField::Eccentricity] = 1.2;
        let handle = lib.load(&record).unwrap();
        assert!(matches!(
            lib.init_propagation(handle),
            Err(FitError::PropagatorInit(_))
        ));

        let mut record = circular_record();
        record[ElementField::MeanMotion] = 17.9;
        let handle = lib.load(&record).unwrap();
        assert!(matches!(
            lib.init_propagation(handle),
            Err(FitError::PropagatorInit(_))
        ));

        lib.clear_all();
        assert_eq!(lib.loaded_count(), 0);
        assert_eq!(
            lib.init_propagation(handle),
            Err(FitError::UnknownSatellite(handle.0))
        );
    }

    #[test]
    fn test_sensor_and_look_angles() {
        let lib = SecularJ2::new();
        let site = GeodeticSite {
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
        };
        let sensor = lib.sensor_state(&site, 27000.25);
        assert_relative_eq!(sensor.position.norm(), WGS84_MAJOR_AXIS_KM, epsilon = 1e-9);

        let target = sensor.position * (1.0 + 1000.0 / sensor.position.norm());
        let look = lib.topocentric_angles(&sensor, &target, &Vector3::zeros());
        assert_relative_eq!(look.range, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(look.elevation, 90.0, epsilon = 1e-4);
        assert_relative_eq!(look.declination, 0.0, epsilon = 1e-9);

        // due north on the horizon
        let north = sensor.position + Vector3::new(0.0, 0.0, 500.0);
        let look = lib.topocentric_angles(&sensor, &north, &Vector3::zeros());
        assert_relative_eq!(look.azimuth, 0.0, epsilon = 1e-9);
        assert_relative_eq!(look.elevation, 0.0, epsilon = 1e-9);
    }
}
