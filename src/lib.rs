pub mod astrolib;
pub mod constants;
pub mod element_record;
pub mod fit_errors;
pub mod fit_session;
pub mod geometry;
pub mod observations;
pub mod optimizer;
pub mod perturb;
pub mod time;

pub use astrolib::{AstroLibrary, EpochState, PropagatorSlot, SecularJ2};
pub use element_record::{ElementField, ElementRecord, EphemerisType};
pub use fit_errors::FitError;
pub use fit_session::{FitParams, FitResult, FitSession, FitSummary};
pub use observations::{Observation, PreparedObservation};
