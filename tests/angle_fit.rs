mod common;

use common::{iss_type0_session, minute_grid, synthetic_observations, MAUI};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tlefit::fit_session::TruthSeries;
use tlefit::observations::read_observations_csv;
use tlefit::{FitError, FitParams};

#[test]
fn angle_fit_on_noisy_track() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(42_u64);

    let mut session = iss_type0_session();
    let seed = session.seed_record().unwrap().clone();
    let times = minute_grid(seed.epoch() + 0.1, 60, 2.0);
    let mut observations = synthetic_observations(&seed, &MAUI, &times, 2.0, &mut rng);
    // arrival order does not matter
    observations.reverse();

    session.set_observations(observations).unwrap();

    let last = times.last().map(tlefit::time::epoch_to_ds50).unwrap();
    approx::assert_abs_diff_eq!(
        session.seed_record().unwrap().epoch(),
        last,
        epsilon = 1e-9
    );
    assert_eq!(session.params(), FitParams::for_angles(60));
    match session.truth() {
        Some(TruthSeries::Angles(prepared)) => {
            assert_eq!(prepared.len(), 60);
            assert!(prepared.windows(2).all(|w| w[0].ds50_utc < w[1].ds50_utc));
        }
        other => panic!("unexpected truth: {other:?}"),
    }

    let result = session.fit().unwrap();
    assert!(result.converged, "{}", result.termination);
    assert!(result.cost < 1e-3, "cost {} deg", result.cost);

    let residuals = session.final_residuals().unwrap();
    assert_eq!(residuals.len(), 60);
    assert!(residuals.iter().all(|r| r.angular_norm() < 0.01));
    assert!(residuals.iter().all(|r| r.range.is_some()));
    assert!(residuals.iter().any(|r| r.position_uvw.is_some()));
    assert!(residuals
        .iter()
        .filter_map(|r| r.position_uvw)
        .all(|uvw| uvw.iter().all(|c| c.is_finite())));
}

#[test]
fn observations_from_csv() {
    let csv = "\
obTime,senlat,senlon,senalt,ra,declination
2024-12-31T16:30:00.000Z,20.7,-156.3,3.0,10.0,20.0
2024-12-31T16:20:00.000Z,20.7,-156.3,3.0,11.0,21.0
";
    let observations = read_observations_csv(csv.as_bytes()).unwrap();
    assert_eq!(observations.len(), 2);

    let mut session = iss_type0_session();
    session.set_observations(observations).unwrap();
    match session.truth() {
        Some(TruthSeries::Angles(prepared)) => {
            assert_eq!(prepared[0].right_ascension, 11.0);
            assert_eq!(prepared[1].right_ascension, 10.0);
        }
        other => panic!("unexpected truth: {other:?}"),
    }
}

#[test]
fn empty_observations_are_rejected() {
    let mut session = iss_type0_session();
    assert_eq!(
        session.set_observations(Vec::new()).err(),
        Some(FitError::EmptyObservations)
    );
    assert!(session.truth().is_none());
}
