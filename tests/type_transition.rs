mod common;

use common::{ISS_LINE1, ISS_LINE2};
use tlefit::element_record::{FIT_TYPE0, FIT_TYPE4};
use tlefit::{ElementField, EphemerisType, FitError, FitSession, SecularJ2};

#[test]
fn type_cycle_restores_mean_motion_exactly() {
    let mut session = FitSession::new(SecularJ2::new());
    session.set_from_lines(ISS_LINE1, ISS_LINE2).unwrap();
    session.set_type0().unwrap();
    let type0 = session.seed_record().unwrap().clone();

    for _ in 0..10 {
        session.set_type2().unwrap();
        session.set_type0().unwrap();
    }
    let back = session.seed_record().unwrap();
    assert_eq!(
        back[ElementField::MeanMotion].to_bits(),
        type0[ElementField::MeanMotion].to_bits()
    );
    assert_eq!(back.field_array(), type0.field_array());
}

#[test]
fn type_switch_resets_field_selection() {
    let mut session = FitSession::new(SecularJ2::new());
    session.set_from_lines(ISS_LINE1, ISS_LINE2).unwrap();
    assert_eq!(session.fields().unwrap(), FIT_TYPE4.as_slice());

    session.set_type2().unwrap();
    assert_eq!(session.fields().unwrap(), FIT_TYPE0.as_slice());
    assert_eq!(
        session.working_record().unwrap().ephemeris_type,
        EphemerisType::Type2
    );
    let pair = session.mean_motion().unwrap();
    assert_eq!(
        session.working_record().unwrap()[ElementField::MeanMotion],
        pair.brouwer
    );

    session.set_fields(&[ElementField::MeanMotion]).unwrap();
    session.set_type4().unwrap();
    assert_eq!(session.fields().unwrap(), FIT_TYPE4.as_slice());
}

#[test]
fn nothing_works_before_seeding() {
    let mut session = FitSession::new(SecularJ2::new());
    assert_eq!(session.set_type2().err(), Some(FitError::NotSeeded));
    assert_eq!(session.set_type4().err(), Some(FitError::NotSeeded));
    assert_eq!(
        session.set_fields(&[ElementField::Inclination]).err(),
        Some(FitError::NotSeeded)
    );
    assert_eq!(session.lines().err(), Some(FitError::NotSeeded));
    assert_eq!(session.set_observations(Vec::new()).err(), Some(FitError::NotSeeded));
}

#[test]
fn malformed_lines_are_reported() {
    let mut session = FitSession::new(SecularJ2::new());
    let err = session.set_from_lines("1 garbage", ISS_LINE2).err();
    assert!(matches!(err, Some(FitError::TleParse(_))));
}
