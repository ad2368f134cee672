//! # Fit objectives
//!
//! Both objectives follow the same protocol for a candidate vector `x` of active-field values:
//!
//! 1. write `x` into the session's **working** record (the record is left holding the last
//!    candidate, not the best one),
//! 2. clear the library, load and initialize the working record through the
//!    [`PropagatorSlot`](crate::astrolib::PropagatorSlot),
//! 3. propagate to every truth time and reduce the residuals to one scalar.
//!
//! Any load, initialization or propagation failure, and any non-finite result, scores `+∞`.
//! Configuration errors (no seed, no truth, a vector of the wrong length) are returned as
//! errors and abort the fit.
//!
//! ## Reductions
//!
//! * Ephemeris: `sqrt( Σ ‖r_i − r̂_i‖ / N )`, the square root of the **mean position error
//!   norm** (km), not a root-mean-square.
//! * Angles: `sqrt( Σ (Δα_i² + Δδ_i²) / (2N) )` in degrees, with shortest-arc differences.

use log::debug;
use nalgebra::Vector3;

use super::{FitSession, TruthSeries};
use crate::astrolib::{AstroLibrary, EpochState, SatHandle, TopoAngles};
use crate::fit_errors::FitError;
use crate::geometry::shortest_angle;
use crate::observations::{angle_residuals, AngleResidual, PreparedObservation};

/// Score `x` against the truth attached to `session`.
///
/// Arguments
/// ---------
/// * `x`: values of the active fields, in selection order
/// * `session`: a seeded session with truth attached
///
/// Return
/// ------
/// * the cost, or `+∞` when the library rejects the candidate (load, initialization or
///   propagation failure)
/// * [`FitError::NotSeeded`], [`FitError::NoTruthData`] or [`FitError::FieldCountMismatch`]
///   when the session is not ready to score `x`
pub fn evaluate<L: AstroLibrary>(x: &[f64], session: &mut FitSession<L>) -> Result<f64, FitError> {
    let cost = match session.truth.as_ref().map(TruthSeries::is_angles) {
        Some(false) => ephemeris_cost(x, session),
        Some(true) => angle_cost(x, session),
        None => Err(FitError::NoTruthData),
    };
    match cost {
        Ok(cost) if cost.is_finite() => {
            debug!("objective {cost:.9}");
            Ok(cost)
        }
        Ok(cost) => {
            debug!("objective not finite ({cost})");
            Ok(f64::INFINITY)
        }
        Err(e) if e.is_candidate_rejection() => {
            debug!("candidate rejected: {e}");
            Ok(f64::INFINITY)
        }
        Err(e) => Err(e),
    }
}

/// Sum of position error norms over the ephemeris truth, reduced as `sqrt(sum / N)`.
fn ephemeris_cost<L: AstroLibrary>(
    x: &[f64],
    session: &mut FitSession<L>,
) -> Result<f64, FitError> {
    let FitSession {
        slot,
        seeded,
        truth,
        ..
    } = session;
    let seeded = seeded.as_mut().ok_or(FitError::NotSeeded)?;
    let Some(TruthSeries::Ephemeris(samples)) = truth.as_ref() else {
        return Err(FitError::NoTruthData);
    };

    seeded.working.apply(&seeded.fields, x)?;
    let sum = slot.with_loaded(&seeded.working, |lib, handle| {
        samples.iter().try_fold(0.0, |acc, sample| {
            let (position, _) = lib.propagate(handle, sample.ds50_utc)?;
            Ok::<f64, FitError>(acc + (position - sample.position).norm())
        })
    })??;

    Ok((sum / samples.len() as f64).sqrt())
}

/// RA/Dec residuals over the angle truth, reduced as `sqrt(sum / 2N)`.
fn angle_cost<L: AstroLibrary>(x: &[f64], session: &mut FitSession<L>) -> Result<f64, FitError> {
    let FitSession {
        slot,
        seeded,
        truth,
        ..
    } = session;
    let seeded = seeded.as_mut().ok_or(FitError::NotSeeded)?;
    let Some(TruthSeries::Angles(observations)) = truth.as_ref() else {
        return Err(FitError::NoTruthData);
    };

    seeded.working.apply(&seeded.fields, x)?;
    let sum = slot.with_loaded(&seeded.working, |lib, handle| {
        observations.iter().try_fold(0.0, |acc, obs| {
            let look = look_angles(lib, handle, obs)?;
            let d_ra = shortest_angle(obs.right_ascension, look.right_ascension);
            let d_dec = shortest_angle(obs.declination, look.declination);
            Ok::<f64, FitError>(acc + d_ra * d_ra + d_dec * d_dec)
        })
    })??;

    Ok((sum / (2.0 * observations.len() as f64)).sqrt())
}

fn look_angles<L: AstroLibrary>(
    lib: &L,
    handle: SatHandle,
    obs: &PreparedObservation,
) -> Result<TopoAngles, FitError> {
    let (position, velocity) = lib.propagate(handle, obs.ds50_utc)?;
    Ok(lib.topocentric_angles(&obs.sensor, &position, &velocity))
}

/// Angle residuals of the working record against the attached observations.
///
/// Return
/// ------
/// * one [`AngleResidual`] per observation, with UVW position residuals against the working
///   record's states, or an error if the session has no angle truth or the working record
///   cannot be propagated
pub fn angle_residual_table<L: AstroLibrary>(
    session: &mut FitSession<L>,
) -> Result<Vec<AngleResidual>, FitError> {
    let FitSession {
        slot,
        seeded,
        truth,
        ..
    } = session;
    let seeded = seeded.as_ref().ok_or(FitError::NotSeeded)?;
    let Some(TruthSeries::Angles(observations)) = truth.as_ref() else {
        return Err(FitError::NoTruthData);
    };

    let (states, looks): (Vec<EpochState>, Vec<TopoAngles>) = slot
        .with_loaded(&seeded.working, |lib, handle| {
            observations
                .iter()
                .map(|obs| -> Result<(EpochState, TopoAngles), FitError> {
                    let (position, velocity) = lib.propagate(handle, obs.ds50_utc)?;
                    let look = lib.topocentric_angles(&obs.sensor, &position, &velocity);
                    Ok((EpochState::new(obs.ds50_utc, position, velocity), look))
                })
                .collect::<Result<Vec<_>, FitError>>()
        })??
        .into_iter()
        .unzip();
    Ok(angle_residuals(observations, &states, &looks))
}

/// Position residual vectors (truth minus working record) over the ephemeris truth.
pub fn ephemeris_residuals<L: AstroLibrary>(
    session: &mut FitSession<L>,
) -> Result<Vec<(f64, Vector3<f64>)>, FitError> {
    let FitSession {
        slot,
        seeded,
        truth,
        ..
    } = session;
    let seeded = seeded.as_ref().ok_or(FitError::NotSeeded)?;
    let Some(TruthSeries::Ephemeris(samples)) = truth.as_ref() else {
        return Err(FitError::NoTruthData);
    };

    slot.with_loaded(&seeded.working, |lib, handle| {
        samples
            .iter()
            .map(|sample: &EpochState| {
                let (position, _) = lib.propagate(handle, sample.ds50_utc)?;
                Ok((sample.ds50_utc, sample.position - position))
            })
            .collect::<Result<Vec<_>, FitError>>()
    })?
}

#[cfg(test)]
mod objective_test {
    use super::*;
    use crate::astrolib::SecularJ2;
    use crate::element_record::ElementField;
    use crate::time::ds50_to_epoch;

    const L1: &str = "1 25544U 98067A   24365.67842578  .00000000  00000-0  00000-0 4  9991";
    const L2: &str = "2 25544  51.6404  61.8250 0005853  25.4579 117.0387 15.50482079489028";

    fn ephemeris_session() -> FitSession<SecularJ2> {
        let mut session = FitSession::new(SecularJ2::new());
        session.set_from_lines(L1, L2).unwrap().set_type0().unwrap();
        let epoch = session.seed_record().unwrap().epoch();
        let times: Vec<_> = (0..=120)
            .map(|i| ds50_to_epoch(epoch + i as f64 / 1440.0))
            .collect();
        session.set_ephemeris_from_seed(&times).unwrap();
        session
    }

    #[test]
    fn test_configuration_errors_are_not_scored() {
        let mut session = FitSession::new(SecularJ2::new());
        assert_eq!(session.evaluate(&[1.0]), Err(FitError::NoTruthData));

        session.set_from_lines(L1, L2).unwrap();
        let x0 = session.initial_fields().unwrap();
        assert_eq!(session.evaluate(&x0), Err(FitError::NoTruthData));
    }

    #[test]
    fn test_wrong_vector_length_is_an_error() {
        let mut session = ephemeris_session();
        let before = session.working_record().unwrap().clone();

        assert_eq!(
            session.evaluate(&[]),
            Err(FitError::FieldCountMismatch {
                expected: 7,
                got: 0
            })
        );
        assert_eq!(
            session.evaluate(&[51.6404]),
            Err(FitError::FieldCountMismatch {
                expected: 7,
                got: 1
            })
        );
        assert!(matches!(
            session.evaluate(&[0.0; 8]),
            Err(FitError::FieldCountMismatch { got: 8, .. })
        ));
        assert_eq!(session.working_record().unwrap(), &before);
    }

    #[test]
    fn test_seed_scores_near_zero() {
        let mut session = ephemeris_session();
        let x0 = session.initial_fields().unwrap();
        assert!(session.evaluate(&x0).unwrap() < 1e-3);
    }

    #[test]
    fn test_rejected_candidate_scores_infinity() {
        let mut session = ephemeris_session();
        let mut x = session.initial_fields().unwrap();
        let ecc = session
            .fields()
            .unwrap()
            .iter()
            .position(|f| *f == ElementField::Eccentricity)
            .unwrap();
        x[ecc] = 1.5;
        assert_eq!(session.evaluate(&x), Ok(f64::INFINITY));
        // the working record keeps the last candidate
        assert_eq!(session.working_record().unwrap()[ElementField::Eccentricity], 1.5);
        assert_eq!(session.library().loaded_count(), 0);
    }

    #[test]
    fn test_cost_is_sqrt_of_mean_norm() {
        let mut session = ephemeris_session();
        let mut x = session.initial_fields().unwrap();
        let ma = session
            .fields()
            .unwrap()
            .iter()
            .position(|f| *f == ElementField::MeanAnomaly)
            .unwrap();
        x[ma] += 0.01;

        let cost = session.evaluate(&x).unwrap();
        let residuals = ephemeris_residuals(&mut session).unwrap();
        let mean_norm =
            residuals.iter().map(|(_, r)| r.norm()).sum::<f64>() / residuals.len() as f64;
        approx::assert_relative_eq!(cost, mean_norm.sqrt(), max_relative = 1e-12);
    }
}
