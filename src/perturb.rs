//! # Element-set perturbation
//!
//! Encoding a state-space perturbation directly into mean elements is strongly nonlinear. The
//! tools here linearize locally around the seed epoch instead:
//!
//! 1. compute the state of the seed at its own epoch and its osculating elements,
//! 2. add radial / in-track / cross-track velocity increments to that state,
//! 3. take the osculating elements of each perturbed state and subtract the unperturbed ones
//!    (angles along the shortest arc),
//! 4. add those deltas to the seed record.
//!
//! The mean motion goes through the semi-major axis: `n' = n(a(n) + Δa)`. The eccentricity is
//! folded back to a non-negative value.
//!
//! [`anomaly_spread`] builds a family of records that differ only by mean anomaly, evenly
//! spread around the orbit.
//!
//! Satellite numbers of generated records are sequential from a caller-chosen start,
//! [`DEFAULT_PERTURB_SATNO`](crate::constants::DEFAULT_PERTURB_SATNO) by convention.

use itertools::Itertools;
use nalgebra::Vector3;

use crate::astrolib::{AstroLibrary, EpochState, KeplerianSet};
use crate::element_record::{ElementField, ElementRecord};
use crate::fit_errors::FitError;
use crate::fit_session::FitSession;
use crate::geometry::RicFrame;

/// Apply an osculating element delta to a record.
///
/// Arguments
/// ---------
/// * `original`: record to perturb
/// * `delta`: element delta; `semi_major_axis` in km, angles in degrees
/// * `library`: mean motion ↔ semi-major axis conversions
///
/// Return
/// ------
/// * the perturbed copy of `original`
pub fn perturb_record<L: AstroLibrary>(
    original: &ElementRecord,
    delta: &KeplerianSet,
    library: &L,
) -> ElementRecord {
    let mut record = original.clone();
    record[ElementField::Eccentricity] =
        (record[ElementField::Eccentricity] + delta.eccentricity).abs();
    record[ElementField::Inclination] += delta.inclination;
    record[ElementField::MeanAnomaly] += delta.mean_anomaly;
    record[ElementField::Node] += delta.node;
    record[ElementField::ArgPerigee] += delta.arg_perigee;

    let semi_major_axis =
        library.mean_motion_to_semi_major_axis(original[ElementField::MeanMotion]);
    record[ElementField::MeanMotion] =
        library.semi_major_axis_to_mean_motion(semi_major_axis + delta.semi_major_axis);
    record
}

/// Osculating element deltas produced by RIC velocity increments applied to `state`.
///
/// Arguments
/// ---------
/// * `library`: state → osculating element conversion
/// * `state`: reference state
/// * `ric_deltas`: `(radial, in-track, cross-track)` velocity increments, km/s
pub fn ric_element_deltas<L: AstroLibrary>(
    library: &L,
    state: &EpochState,
    ric_deltas: &[Vector3<f64>],
) -> Vec<KeplerianSet> {
    let reference = library.osculating_elements(&state.position, &state.velocity);
    let frame = RicFrame::from_state(&state.position, &state.velocity);
    ric_deltas
        .iter()
        .map(|ric| {
            let velocity = frame.perturb_velocity(&state.velocity, ric);
            library
                .osculating_elements(&state.position, &velocity)
                .delta_from(&reference)
        })
        .collect()
}

/// One perturbed copy of the session seed per RIC velocity increment.
///
/// Arguments
/// ---------
/// * `session`: a seeded session
/// * `ric_deltas`: `(radial, in-track, cross-track)` velocity increments, km/s
/// * `first_satno`: satellite number of the first generated record, the others follow
///
/// Return
/// ------
/// * the perturbed records, in the order of `ric_deltas`
pub fn perturb_ric<L: AstroLibrary>(
    session: &mut FitSession<L>,
    ric_deltas: &[Vector3<f64>],
    first_satno: u32,
) -> Result<Vec<ElementRecord>, FitError> {
    let seed = session.seed_record()?.clone();
    let state = session.seed_state_at(seed.epoch())?;
    let library = session.library();

    Ok(ric_element_deltas(library, &state, ric_deltas)
        .iter()
        .zip(first_satno..)
        .map(|(delta, sat_num)| {
            let mut record = perturb_record(&seed, delta, library);
            record.sat_num = sat_num;
            record
        })
        .collect())
}

/// Copies of `record` with mean anomalies `(M + k · 360 / (samples − 1)) mod 360`,
/// `k = 0..samples`.
///
/// Both ends of the spread are included, so with `samples ≥ 2` the first and last records
/// coincide in mean anomaly.
pub fn anomaly_spread(record: &ElementRecord, samples: usize, first_satno: u32) -> Vec<ElementRecord> {
    let step = if samples > 1 {
        360.0 / (samples - 1) as f64
    } else {
        0.0
    };
    let base = record[ElementField::MeanAnomaly];

    (0..samples)
        .map(|k| (base + step * k as f64).rem_euclid(360.0))
        .zip_eq(first_satno..first_satno + samples as u32)
        .map(|(mean_anomaly, sat_num)| {
            let mut shifted = record.clone();
            shifted[ElementField::MeanAnomaly] = mean_anomaly;
            shifted.sat_num = sat_num;
            shifted
        })
        .collect()
}
