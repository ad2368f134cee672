//! # Angle-only observations
//!
//! This module turns raw sensor observations into the form the angle objective consumes.
//!
//! ## Pipeline
//!
//! 1. **Ingestion** – [`read_observations_csv`] deserializes rows with `csv` + `serde`.
//!    Expected header:
//!
//!    ```text
//!    obTime,senlat,senlon,senalt,ra,declination,azimuth,elevation,range
//!    ```
//!
//!    `obTime` is ISO 8601 UTC, angles are degrees, `senalt` and `range` kilometers.
//!    `azimuth`, `elevation` and `range` may be empty or absent.
//!
//! 2. **Preparation** – [`prepare_observations`] sorts by time, converts to ds50, computes the
//!    sensor's inertial position and sidereal angle, rotates the J2000 right ascension and
//!    declination to the true-of-date frame and builds the unit look vector.
//!
//! 3. **Residuals** – [`angle_residuals`] compares prepared observations with computed look
//!    angles using [`shortest_angle`] for every angular component, and expresses the position
//!    error along the look ray in the UVW frame of the computed state.
//!
//! ## See also
//! * [`crate::geometry::plane_intersection_ranges`] – ranges to the orbit plane along the look vectors.
//! * [`crate::fit_session::FitSession::set_observations`] – attaches prepared observations as truth.

use hifitime::Epoch;
use itertools::Itertools;
use nalgebra::Vector3;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::astrolib::{AstroLibrary, EpochState, GeodeticSite, SensorState, TopoAngles};
use crate::constants::{Degree, Ds50, Kilometer};
use crate::fit_errors::FitError;
use crate::geometry::{ra_dec_to_look_vector, shortest_angle, uvw_position_residuals};
use crate::time::{epoch_to_ds50, parse_epoch};

/// One angle-only observation from a ground sensor.
///
/// Right ascension and declination are J2000, in degrees. Azimuth, elevation and range are
/// optional and only used for residual reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: Epoch,
    pub site: GeodeticSite,
    pub right_ascension: Degree,
    pub declination: Degree,
    pub azimuth: Option<Degree>,
    pub elevation: Option<Degree>,
    pub range: Option<Kilometer>,
}

impl Observation {
    pub fn new(time: Epoch, site: GeodeticSite, right_ascension: Degree, declination: Degree) -> Self {
        Observation {
            time,
            site,
            right_ascension,
            declination,
            azimuth: None,
            elevation: None,
            range: None,
        }
    }

    /// Build a synthetic observation carrying every component of computed look angles.
    pub fn from_look(time: Epoch, site: GeodeticSite, look: &TopoAngles) -> Self {
        Observation {
            time,
            site,
            right_ascension: look.right_ascension,
            declination: look.declination,
            azimuth: Some(look.azimuth),
            elevation: Some(look.elevation),
            range: Some(look.range),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObservationRow {
    #[serde(rename = "obTime")]
    ob_time: String,
    senlat: f64,
    senlon: f64,
    senalt: f64,
    ra: f64,
    declination: f64,
    #[serde(default)]
    azimuth: Option<f64>,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    range: Option<f64>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = FitError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        Ok(Observation {
            time: parse_epoch(&row.ob_time)?,
            site: GeodeticSite {
                latitude: row.senlat,
                longitude: row.senlon,
                height: row.senalt,
            },
            right_ascension: row.ra,
            declination: row.declination,
            azimuth: row.azimuth,
            elevation: row.elevation,
            range: row.range,
        })
    }
}

/// Read observations from CSV data.
///
/// Arguments
/// ---------
/// * `reader`: any byte source holding CSV with the header documented at module level
///
/// Return
/// ------
/// * the observations in file order, or the first CSV / time parsing error
pub fn read_observations_csv<R: Read>(reader: R) -> Result<Vec<Observation>, FitError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize::<ObservationRow>()
        .map(|row| Observation::try_from(row?))
        .collect()
}

/// Read observations from a CSV file.
pub fn read_observations_csv_file(path: impl AsRef<Path>) -> Result<Vec<Observation>, FitError> {
    let mut csv_reader = csv::Reader::from_path(path)?;
    csv_reader
        .deserialize::<ObservationRow>()
        .map(|row| Observation::try_from(row?))
        .collect()
}

/// An observation with everything the angle objective needs precomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedObservation {
    pub observation: Observation,
    pub ds50_utc: Ds50,
    /// Greenwich mean sidereal time, radians
    pub theta: f64,
    /// True-of-date right ascension, degrees
    pub right_ascension: Degree,
    /// True-of-date declination, degrees
    pub declination: Degree,
    /// Unit line of sight in the true-of-date frame
    pub look_vector: Vector3<f64>,
    pub sensor: SensorState,
}

/// Sort and enrich observations for the angle objective.
///
/// Arguments
/// ---------
/// * `observations`: raw observations, any order
/// * `library`: provides sensor positions and the J2000 → true-of-date rotation
///
/// Return
/// ------
/// * prepared observations sorted by time, or [`FitError::EmptyObservations`]
pub fn prepare_observations<L: AstroLibrary>(
    observations: Vec<Observation>,
    library: &L,
) -> Result<Vec<PreparedObservation>, FitError> {
    if observations.is_empty() {
        return Err(FitError::EmptyObservations);
    }

    Ok(observations
        .into_iter()
        .map(|observation| {
            let ds50_utc = epoch_to_ds50(&observation.time);
            let sensor = library.sensor_state(&observation.site, ds50_utc);
            let (right_ascension, declination) = library.rotate_ra_dec_to_date(
                ds50_utc,
                observation.right_ascension,
                observation.declination,
            );
            PreparedObservation {
                ds50_utc,
                theta: sensor.theta,
                right_ascension,
                declination,
                look_vector: ra_dec_to_look_vector(right_ascension, declination),
                sensor,
                observation,
            }
        })
        .sorted_by(|a, b| a.ds50_utc.total_cmp(&b.ds50_utc))
        .collect())
}

/// Observed minus computed angles for one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleResidual {
    pub ds50_utc: Ds50,
    pub right_ascension: Degree,
    pub declination: Degree,
    pub azimuth: Option<Degree>,
    pub elevation: Option<Degree>,
    pub range: Option<Kilometer>,
    /// Observed minus computed position in the computed UVW frame, km; `None` when the look
    /// ray is parallel to the orbit plane
    pub position_uvw: Option<Vector3<f64>>,
}

impl AngleResidual {
    /// `sqrt(Δα² + Δδ²)` in degrees.
    pub fn angular_norm(&self) -> Degree {
        self.right_ascension.hypot(self.declination)
    }
}

/// Residuals between prepared observations and computed look angles, index by index.
///
/// Angular components use the shortest signed difference; range is a plain difference.
/// Optional components stay `None` when the observation did not carry them.
/// `states` are the computed states the `looks` were taken from.
pub fn angle_residuals(
    observations: &[PreparedObservation],
    states: &[EpochState],
    looks: &[TopoAngles],
) -> Vec<AngleResidual> {
    let positions = uvw_position_residuals(states, observations);
    observations
        .iter()
        .zip(looks)
        .zip(positions)
        .map(|((obs, look), position_uvw)| AngleResidual {
            ds50_utc: obs.ds50_utc,
            right_ascension: shortest_angle(obs.right_ascension, look.right_ascension),
            declination: shortest_angle(obs.declination, look.declination),
            azimuth: obs
                .observation
                .azimuth
                .map(|az| shortest_angle(az, look.azimuth)),
            elevation: obs
                .observation
                .elevation
                .map(|el| shortest_angle(el, look.elevation)),
            range: obs.observation.range.map(|range| range - look.range),
            position_uvw,
        })
        .collect()
}
