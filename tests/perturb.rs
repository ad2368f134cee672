mod common;

use approx::assert_relative_eq;
use common::iss_type0_session;
use nalgebra::Vector3;
use tlefit::astrolib::{AstroLibrary, KeplerianSet};
use tlefit::constants::DEFAULT_PERTURB_SATNO;
use tlefit::perturb::{anomaly_spread, perturb_ric, ric_element_deltas};
use tlefit::ElementField;

#[test]
fn opposite_burns_average_out() {
    let mut session = iss_type0_session();
    let epoch = session.seed_record().unwrap().epoch();
    let state = session.seed_state_at(epoch).unwrap();

    let ric = Vector3::new(0.002, 0.003, -0.001);
    let deltas = ric_element_deltas(session.library(), &state, &[ric, -ric]);
    let mean = KeplerianSet::mean_of(&deltas);

    // first order terms cancel, what remains is second order in the burn
    assert!(deltas[0].semi_major_axis.abs() > 1.0);
    assert!(mean.semi_major_axis.abs() < 1e-2 * deltas[0].semi_major_axis.abs());
    assert!(mean.inclination.abs() < 1e-2 * deltas[0].inclination.abs());
}

#[test]
fn zero_burn_is_an_exact_zero_delta() {
    let mut session = iss_type0_session();
    let epoch = session.seed_record().unwrap().epoch();
    let state = session.seed_state_at(epoch).unwrap();

    let deltas = ric_element_deltas(session.library(), &state, &[Vector3::zeros(); 2]);
    assert_eq!(deltas, vec![KeplerianSet::default(); 2]);
}

#[test]
fn perturbed_family_is_loadable_text() {
    let mut session = iss_type0_session();
    let family = perturb_ric(
        &mut session,
        &[
            Vector3::new(0.001, 0.0, 0.0),
            Vector3::new(0.0, 0.001, 0.0),
            Vector3::new(0.0, 0.0, 0.001),
        ],
        DEFAULT_PERTURB_SATNO,
    )
    .unwrap();

    assert_eq!(family.len(), 3);
    for (k, record) in family.iter().enumerate() {
        assert_eq!(record.sat_num, DEFAULT_PERTURB_SATNO + k as u32);
        let (line1, line2) = session.library().record_to_text(record).unwrap();
        let parsed = session.library().text_to_record(&line1, &line2).unwrap();
        assert_relative_eq!(
            parsed[ElementField::MeanMotion],
            record[ElementField::MeanMotion],
            epsilon = 1e-8
        );
    }
}

#[test]
fn anomaly_family_covers_the_orbit() {
    let session = iss_type0_session();
    let seed = session.seed_record().unwrap();
    let family = anomaly_spread(seed, 13, 90000);

    assert_eq!(family.len(), 13);
    assert_relative_eq!(
        family[0][ElementField::MeanAnomaly],
        seed[ElementField::MeanAnomaly]
    );
    assert_relative_eq!(
        family[12][ElementField::MeanAnomaly],
        seed[ElementField::MeanAnomaly],
        epsilon = 1e-9
    );
    assert_relative_eq!(
        family[3][ElementField::MeanAnomaly],
        (seed[ElementField::MeanAnomaly] + 90.0) % 360.0,
        epsilon = 1e-9
    );
    assert!(family
        .iter()
        .all(|r| r[ElementField::MeanAnomaly] >= 0.0 && r[ElementField::MeanAnomaly] < 360.0));
}
