use thiserror::Error;

use crate::element_record::{ElementField, EphemerisType};

#[derive(Error, Debug)]
pub enum FitError {
    // --- configuration -------------------------------------------------------------------------
    #[error("The fit session has no seed element set; load one from lines or a state vector first")]
    NotSeeded,

    #[error("Field {field} is not defined for ephemeris type {ephemeris_type}")]
    FieldNotDefinedForType {
        field: ElementField,
        ephemeris_type: EphemerisType,
    },

    #[error("Invalid ephemeris type: {0}")]
    InvalidEphemerisType(i32),

    #[error("Invalid fit parameter: {0}")]
    InvalidFitParameter(String),

    #[error("The field selection is empty")]
    EmptyFieldSelection,

    #[error("Expected {expected} values for the active fields, got {got}")]
    FieldCountMismatch { expected: usize, got: usize },

    #[error("No truth data (ephemeris or observations) attached to the fit session")]
    NoTruthData,

    #[error("No fit has been run on this session")]
    NoFitResult,

    // --- external library ----------------------------------------------------------------------
    #[error("Unable to load element set: {0}")]
    InvalidElementLoad(String),

    #[error("Propagator initialization failed: {0}")]
    PropagatorInit(String),

    #[error("Propagation failed: {0}")]
    Propagation(String),

    #[error("Satellite handle {0} is not loaded")]
    UnknownSatellite(u64),

    #[error("TLE parsing error: {0}")]
    TleParse(String),

    // --- geometry ------------------------------------------------------------------------------
    #[error("Look ray is parallel to the orbit plane (|L·n| = {denominator:e})")]
    DegeneratePlaneIntersection { denominator: f64 },

    // --- data ----------------------------------------------------------------------------------
    #[error("Truth series is not strictly increasing in time at sample {index}")]
    NonMonotonicTruth { index: usize },

    #[error("The truth series is empty")]
    EmptyTruth,

    #[error("No observations were supplied")]
    EmptyObservations,

    #[error("Time conversion error: {0}")]
    TimeConversion(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for FitError {
    fn eq(&self, other: &Self) -> bool {
        use FitError::*;
        match (self, other) {
            (NotSeeded, NotSeeded) => true,
            (
                FieldNotDefinedForType {
                    field: f1,
                    ephemeris_type: t1,
                },
                FieldNotDefinedForType {
                    field: f2,
                    ephemeris_type: t2,
                },
            ) => f1 == f2 && t1 == t2,
            (InvalidEphemerisType(a), InvalidEphemerisType(b)) => a == b,
            (InvalidFitParameter(a), InvalidFitParameter(b)) => a == b,
            (EmptyFieldSelection, EmptyFieldSelection) => true,
            (
                FieldCountMismatch {
                    expected: e1,
                    got: g1,
                },
                FieldCountMismatch {
                    expected: e2,
                    got: g2,
                },
            ) => e1 == e2 && g1 == g2,
            (NoTruthData, NoTruthData) => true,
            (NoFitResult, NoFitResult) => true,
            (InvalidElementLoad(a), InvalidElementLoad(b)) => a == b,
            (PropagatorInit(a), PropagatorInit(b)) => a == b,
            (Propagation(a), Propagation(b)) => a == b,
            (UnknownSatellite(a), UnknownSatellite(b)) => a == b,
            (TleParse(a), TleParse(b)) => a == b,
            (
                DegeneratePlaneIntersection { denominator: a },
                DegeneratePlaneIntersection { denominator: b },
            ) => a == b,
            (NonMonotonicTruth { index: a }, NonMonotonicTruth { index: b }) => a == b,
            (EmptyTruth, EmptyTruth) => true,
            (EmptyObservations, EmptyObservations) => true,
            (TimeConversion(a), TimeConversion(b)) => a == b,

            // csv errors are not comparable: same variant is enough
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}

impl FitError {
    /// Errors the external library raises for one candidate element set.
    ///
    /// The objective scores these as `+∞`; every other error is a configuration or data problem
    /// and aborts the fit.
    pub fn is_candidate_rejection(&self) -> bool {
        matches!(
            self,
            FitError::InvalidElementLoad(_)
                | FitError::PropagatorInit(_)
                | FitError::Propagation(_)
                | FitError::UnknownSatellite(_)
        )
    }
}
