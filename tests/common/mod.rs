#![allow(dead_code)]

use approx::assert_relative_eq;
use hifitime::Epoch;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use tlefit::astrolib::{AstroLibrary, GeodeticSite};
use tlefit::constants::{Ds50, ARCSEC_TO_DEG};
use tlefit::time::ds50_to_epoch;
use tlefit::{ElementField, ElementRecord, FitSession, Observation, SecularJ2};

pub const ISS_LINE1: &str =
    "1 25544U 98067A   24365.67842578  .00000000  00000-0  00000-0 4  9991";
pub const ISS_LINE2: &str =
    "2 25544  51.6404  61.8250 0005853  25.4579 117.0387 15.50482079489028";

/// Ground site on Maui.
pub const MAUI: GeodeticSite = GeodeticSite {
    latitude: 20.7,
    longitude: -156.3,
    height: 3.0,
};

/// Session seeded from the ISS lines, renumbered and switched to type 0.
pub fn iss_type0_session() -> FitSession<SecularJ2> {
    let mut session = FitSession::new(SecularJ2::new());
    session
        .set_from_lines(ISS_LINE1, ISS_LINE2)
        .unwrap()
        .set_satno(77777)
        .unwrap()
        .set_type0()
        .unwrap();
    session
}

/// `count` epochs spaced by `step_minutes`, starting at `start`.
pub fn minute_grid(start: Ds50, count: usize, step_minutes: f64) -> Vec<Epoch> {
    (0..count)
        .map(|i| ds50_to_epoch(start + i as f64 * step_minutes / 1440.0))
        .collect()
}

/// Angle observations of `record` from `site`, with Gaussian noise of `noise_arcsec` on both
/// angles.
pub fn synthetic_observations(
    record: &ElementRecord,
    site: &GeodeticSite,
    times: &[Epoch],
    noise_arcsec: f64,
    rng: &mut StdRng,
) -> Vec<Observation> {
    let mut lib = SecularJ2::new();
    let handle = lib.load(record).unwrap();
    lib.init_propagation(handle).unwrap();
    let noise = Normal::new(0.0, noise_arcsec * ARCSEC_TO_DEG).unwrap();

    times
        .iter()
        .map(|time| {
            let ds50 = tlefit::time::epoch_to_ds50(time);
            let (position, velocity) = lib.propagate(handle, ds50).unwrap();
            let sensor = lib.sensor_state(site, ds50);
            let mut look = lib.topocentric_angles(&sensor, &position, &velocity);
            look.right_ascension += noise.sample(rng);
            look.declination += noise.sample(rng);
            Observation::from_look(*time, *site, &look)
        })
        .collect()
}

pub fn assert_shape_close(actual: &ElementRecord, expected: &ElementRecord, epsilon: f64) {
    for field in [
        ElementField::Inclination,
        ElementField::Eccentricity,
        ElementField::MeanMotion,
    ] {
        assert_relative_eq!(actual[field], expected[field], epsilon = epsilon);
    }
}
