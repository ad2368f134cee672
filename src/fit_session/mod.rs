//! # Fit session
//!
//! A [`FitSession`] owns everything one element-set fit needs:
//!
//! - the **seed** record (from two-line text, a raw record or a state vector) and the **working**
//!   record the objective writes candidate values into,
//! - both mean motion conventions of the seed ([`MeanMotionPair`]), so switching between
//!   ephemeris types never loses precision,
//! - the active field selection,
//! - the **truth** series: either a dense ephemeris or prepared angle-only observations,
//! - the [`PropagatorSlot`] through which every propagation goes,
//! - the outcome of the last fit.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──set_from_lines / set_from_record / seed_from_state──▶ seeded
//! seeded ──set_type0/2/4, set_satno, set_agom, set_fields, clear_nonconservatives──▶ seeded
//! seeded ──set_ephemeris / set_ephemeris_from_seed / set_observations──▶ ready
//! ready ──fit──▶ fitted (converged or not)
//! ```
//!
//! Attaching truth re-epochs the seed: the state at the fit epoch (middle ephemeris sample, or
//! the last observation) is converted to mean elements and written into both seed and working
//! records.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tlefit::astrolib::SecularJ2;
//! use tlefit::fit_session::FitSession;
//! use tlefit::time::ds50_to_epoch;
//!
//! let line1 = "1 25544U 98067A   24365.67842578  .00000000  00000-0  00000-0 4  9991";
//! let line2 = "2 25544  51.6404  61.8250 0005853  25.4579 117.0387 15.50482079489028";
//!
//! let mut session = FitSession::new(SecularJ2::new());
//! session.set_from_lines(line1, line2)?.set_satno(77777)?.set_type0()?;
//!
//! let epoch = session.seed_record()?.epoch();
//! let times: Vec<_> = (0..=2880).map(|i| ds50_to_epoch(epoch + i as f64 / 1440.0)).collect();
//! session.set_ephemeris_from_seed(&times)?;
//!
//! let result = session.fit()?;
//! println!("{}", session.summarize()?);
//! # Ok::<(), tlefit::fit_errors::FitError>(())
//! ```

pub mod driver;
pub mod fit_params;
pub mod objective;
pub mod simplex;

use hifitime::Epoch;
use itertools::Itertools;
use log::{debug, info};

use crate::astrolib::{AstroLibrary, EpochState, KeplerianSet, PropagatorSlot};
use crate::constants::{Ds50, RevPerDay};
use crate::element_record::{
    ElementField, ElementRecord, EphemerisType, MeanMotionKind, NON_CONSERVATIVES,
};
use crate::fit_errors::FitError;
use crate::observations::{prepare_observations, AngleResidual, Observation, PreparedObservation};
use crate::time::epoch_to_ds50;

pub use driver::{FitResult, FitSummary};
pub use fit_params::{FitParams, FitParamsBuilder};

/// Kozai and Brouwer mean motions of the same orbit, rev/day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanMotionPair {
    pub kozai: RevPerDay,
    pub brouwer: RevPerDay,
}

impl MeanMotionPair {
    pub fn for_kind(&self, kind: MeanMotionKind) -> RevPerDay {
        match kind {
            MeanMotionKind::Kozai => self.kozai,
            MeanMotionKind::Brouwer => self.brouwer,
        }
    }
}

/// Reference data a fit is scored against.
#[derive(Debug, Clone, PartialEq)]
pub enum TruthSeries {
    /// Dense position/velocity samples, strictly increasing in time.
    Ephemeris(Vec<EpochState>),
    /// Angle-only observations, sorted by time.
    Angles(Vec<PreparedObservation>),
}

impl TruthSeries {
    pub fn len(&self) -> usize {
        match self {
            TruthSeries::Ephemeris(samples) => samples.len(),
            TruthSeries::Angles(observations) => observations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_angles(&self) -> bool {
        matches!(self, TruthSeries::Angles(_))
    }

    /// First and last sample times, ds50.
    pub fn span(&self) -> (Ds50, Ds50) {
        let times: Vec<Ds50> = match self {
            TruthSeries::Ephemeris(samples) => samples.iter().map(|s| s.ds50_utc).collect(),
            TruthSeries::Angles(observations) => {
                observations.iter().map(|o| o.ds50_utc).collect()
            }
        };
        (
            times.first().copied().unwrap_or(f64::NAN),
            times.last().copied().unwrap_or(f64::NAN),
        )
    }
}

#[derive(Debug, Clone)]
struct Seeded {
    seed: ElementRecord,
    working: ElementRecord,
    fields: Vec<ElementField>,
    mean_motion: MeanMotionPair,
    /// Record as first seeded, before any re-epoch or type change
    original: ElementRecord,
    source_lines: Option<(String, String)>,
}

/// State of one element-set fit. See the module documentation for the lifecycle.
#[derive(Debug)]
pub struct FitSession<L: AstroLibrary> {
    slot: PropagatorSlot<L>,
    params: Option<FitParams>,
    seeded: Option<Seeded>,
    truth: Option<TruthSeries>,
    last_fit: Option<FitResult>,
    final_residuals: Option<Vec<AngleResidual>>,
}

impl<L: AstroLibrary> FitSession<L> {
    pub fn new(library: L) -> Self {
        FitSession {
            slot: PropagatorSlot::new(library),
            params: None,
            seeded: None,
            truth: None,
            last_fit: None,
            final_residuals: None,
        }
    }

    pub fn with_params(library: L, params: FitParams) -> Self {
        FitSession {
            params: Some(params),
            ..Self::new(library)
        }
    }

    /// Parameters the next fit will use.
    ///
    /// Explicitly set parameters win; otherwise ephemeris fits use [`FitParams::default`] and
    /// angle fits [`FitParams::for_angles`] over the attached observations.
    pub fn params(&self) -> FitParams {
        match (&self.params, &self.truth) {
            (Some(params), _) => params.clone(),
            (None, Some(truth @ TruthSeries::Angles(_))) => FitParams::for_angles(truth.len()),
            (None, _) => FitParams::default(),
        }
    }

    pub fn set_params(&mut self, params: FitParams) -> &mut Self {
        self.params = Some(params);
        self
    }

    pub fn library(&self) -> &L {
        self.slot.library()
    }

    pub fn into_library(self) -> L {
        self.slot.into_library()
    }

    fn seeded(&self) -> Result<&Seeded, FitError> {
        self.seeded.as_ref().ok_or(FitError::NotSeeded)
    }

    fn seeded_mut(&mut self) -> Result<&mut Seeded, FitError> {
        self.seeded.as_mut().ok_or(FitError::NotSeeded)
    }

    fn invalidate_results(&mut self) {
        self.last_fit = None;
        self.final_residuals = None;
    }

    // ---------------------------------------------------------------------------------------------
    // Seeding
    // ---------------------------------------------------------------------------------------------

    /// Seed the session from two lines of element text.
    ///
    /// Arguments
    /// ---------
    /// * `line1`, `line2`: the element set
    ///
    /// Return
    /// ------
    /// * `&mut self` for chaining, or a parse / load error
    pub fn set_from_lines(&mut self, line1: &str, line2: &str) -> Result<&mut Self, FitError> {
        let record = self.slot.library().text_to_record(line1, line2)?;
        self.seed_with(record, Some((line1.trim_end().to_string(), line2.trim_end().to_string())))
    }

    /// Seed the session from an element record.
    pub fn set_from_record(&mut self, record: ElementRecord) -> Result<&mut Self, FitError> {
        self.seed_with(record, None)
    }

    /// Seed the session from a state vector, creating a fresh record with no drag terms.
    ///
    /// Arguments
    /// ---------
    /// * `state`: position and velocity at the new epoch
    /// * `sat_num`: satellite number of the new record, usually
    ///   [`DEFAULT_FIT_SATNO`](crate::constants::DEFAULT_FIT_SATNO)
    /// * `ephemeris_type`: propagation theory of the new record
    pub fn seed_from_state(
        &mut self,
        state: &EpochState,
        sat_num: u32,
        ephemeris_type: EphemerisType,
    ) -> Result<&mut Self, FitError> {
        let (mean, pair) = self.mean_elements_of(state)?;
        let mut record = ElementRecord::new(sat_num, ephemeris_type);
        write_mean_elements(&mut record, state.ds50_utc, &mean, &pair);
        self.seed_with(record, None)
    }

    fn seed_with(
        &mut self,
        record: ElementRecord,
        source_lines: Option<(String, String)>,
    ) -> Result<&mut Self, FitError> {
        self.slot.with_loaded(&record, |_, _| ())?;

        let lib = self.slot.library();
        let ecc = record[ElementField::Eccentricity];
        let incl = record[ElementField::Inclination];
        let n = record[ElementField::MeanMotion];
        let mean_motion = match record.ephemeris_type.mean_motion_kind() {
            MeanMotionKind::Kozai => MeanMotionPair {
                kozai: n,
                brouwer: lib.kozai_to_brouwer(ecc, incl, n),
            },
            MeanMotionKind::Brouwer => MeanMotionPair {
                kozai: lib.brouwer_to_kozai(ecc, incl, n),
                brouwer: n,
            },
        };

        info!(
            "seeded element set {} ({}) at ds50 {:.8}",
            record.sat_num,
            record.ephemeris_type,
            record.epoch()
        );
        self.seeded = Some(Seeded {
            fields: record.ephemeris_type.fit_fields().to_vec(),
            working: record.clone(),
            original: record.clone(),
            seed: record,
            mean_motion,
            source_lines,
        });
        self.truth = None;
        self.invalidate_results();
        Ok(self)
    }

    /// Mean elements and mean motion pair of a state vector.
    fn mean_elements_of(
        &self,
        state: &EpochState,
    ) -> Result<(KeplerianSet, MeanMotionPair), FitError> {
        let lib = self.slot.library();
        let osculating = lib.osculating_elements(&state.position, &state.velocity);
        let mean = lib.mean_elements(&osculating);
        if !(mean.semi_major_axis > 0.0 && (0.0..1.0).contains(&mean.eccentricity))
            || !mean.as_array().iter().all(|v| v.is_finite())
        {
            return Err(FitError::InvalidElementLoad(format!(
                "state at ds50 {} does not describe a bound orbit",
                state.ds50_utc
            )));
        }
        let brouwer = lib.semi_major_axis_to_mean_motion(mean.semi_major_axis);
        let kozai = lib.brouwer_to_kozai(mean.eccentricity, mean.inclination, brouwer);
        Ok((mean, MeanMotionPair { kozai, brouwer }))
    }

    /// Re-epoch the seed at a state vector.
    ///
    /// The state is converted to osculating then mean elements; epoch, inclination, node,
    /// eccentricity, argument of perigee, mean anomaly and mean motion (in the convention of the
    /// current type) are written into both seed and working records. Drag terms are kept.
    ///
    /// The re-epoched seed must load and initialize in the library; otherwise the session is
    /// left unchanged and the library error is returned.
    pub fn set_from_state(&mut self, state: &EpochState) -> Result<&mut Self, FitError> {
        let (mean, pair) = self.mean_elements_of(state)?;
        let mut candidate = self.seeded()?.seed.clone();
        write_mean_elements(&mut candidate, state.ds50_utc, &mean, &pair);
        self.slot.with_loaded(&candidate, |_, _| ())?;

        let seeded = self.seeded_mut()?;
        write_mean_elements(&mut seeded.working, state.ds50_utc, &mean, &pair);
        seeded.seed = candidate;
        seeded.mean_motion = pair;
        debug!("seed re-epoched at ds50 {:.8}", state.ds50_utc);
        self.invalidate_results();
        Ok(self)
    }

    // ---------------------------------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------------------------------

    /// Switch the seed and working records to `ephemeris_type`.
    ///
    /// The mean motion is taken from the stored [`MeanMotionPair`] in the convention of the new
    /// type, and the field selection resets to the type's defaults.
    pub fn set_ephemeris_type(
        &mut self,
        ephemeris_type: EphemerisType,
    ) -> Result<&mut Self, FitError> {
        let seeded = self.seeded_mut()?;
        let n = seeded
            .mean_motion
            .for_kind(ephemeris_type.mean_motion_kind());
        for record in [&mut seeded.seed, &mut seeded.working] {
            record.ephemeris_type = ephemeris_type;
            record[ElementField::MeanMotion] = n;
        }
        seeded.fields = ephemeris_type.fit_fields().to_vec();
        debug!("ephemeris type set to {ephemeris_type}");
        self.invalidate_results();
        Ok(self)
    }

    /// SGP4 with Kozai mean motion.
    pub fn set_type0(&mut self) -> Result<&mut Self, FitError> {
        self.set_ephemeris_type(EphemerisType::Type0)
    }

    /// SGP4 with Brouwer mean motion.
    pub fn set_type2(&mut self) -> Result<&mut Self, FitError> {
        self.set_ephemeris_type(EphemerisType::Type2)
    }

    /// SGP4-XP with Kozai mean motion.
    pub fn set_type4(&mut self) -> Result<&mut Self, FitError> {
        self.set_ephemeris_type(EphemerisType::Type4)
    }

    pub fn set_satno(&mut self, sat_num: u32) -> Result<&mut Self, FitError> {
        let seeded = self.seeded_mut()?;
        seeded.seed.sat_num = sat_num;
        seeded.working.sat_num = sat_num;
        Ok(self)
    }

    /// Set the solar radiation pressure coefficient on seed and working records.
    pub fn set_agom(&mut self, agom: f64) -> Result<&mut Self, FitError> {
        let seeded = self.seeded_mut()?;
        seeded.seed[ElementField::AgomGp] = agom;
        seeded.working[ElementField::AgomGp] = agom;
        Ok(self)
    }

    /// Zero every drag and radiation pressure term on seed and working records.
    pub fn clear_nonconservatives(&mut self) -> Result<&mut Self, FitError> {
        let seeded = self.seeded_mut()?;
        for field in NON_CONSERVATIVES {
            seeded.seed[field] = 0.0;
            seeded.working[field] = 0.0;
        }
        Ok(self)
    }

    /// Replace the active field selection.
    ///
    /// Errors
    /// ------
    /// * [`FitError::EmptyFieldSelection`] for an empty list
    /// * [`FitError::FieldNotDefinedForType`] for a field the current type does not read
    pub fn set_fields(&mut self, fields: &[ElementField]) -> Result<&mut Self, FitError> {
        let seeded = self.seeded_mut()?;
        if fields.is_empty() {
            return Err(FitError::EmptyFieldSelection);
        }
        let ephemeris_type = seeded.seed.ephemeris_type;
        if let Some(&field) = fields.iter().find(|f| !ephemeris_type.defines(**f)) {
            return Err(FitError::FieldNotDefinedForType {
                field,
                ephemeris_type,
            });
        }
        seeded.fields = fields.to_vec();
        Ok(self)
    }

    /// Active field selection.
    pub fn fields(&self) -> Result<&[ElementField], FitError> {
        Ok(&self.seeded()?.fields)
    }

    pub fn seed_record(&self) -> Result<&ElementRecord, FitError> {
        Ok(&self.seeded()?.seed)
    }

    pub fn working_record(&self) -> Result<&ElementRecord, FitError> {
        Ok(&self.seeded()?.working)
    }

    pub fn mean_motion(&self) -> Result<MeanMotionPair, FitError> {
        Ok(self.seeded()?.mean_motion)
    }

    /// Values of the active fields in the seed record, the fit's starting point.
    pub fn initial_fields(&self) -> Result<Vec<f64>, FitError> {
        let seeded = self.seeded()?;
        Ok(seeded.seed.values_of(&seeded.fields))
    }

    /// Copy every field outside the active selection from the seed back into the working record.
    pub fn reset_working(&mut self) -> Result<(), FitError> {
        let seeded = self.seeded_mut()?;
        for field in ElementField::ALL {
            if !seeded.fields.contains(&field) {
                seeded.working[field] = seeded.seed[field];
            }
        }
        seeded.working.sat_num = seeded.seed.sat_num;
        seeded.working.ephemeris_type = seeded.seed.ephemeris_type;
        Ok(())
    }

    /// Two-line text of the working record.
    pub fn lines(&self) -> Result<(String, String), FitError> {
        self.slot.library().record_to_text(&self.seeded()?.working)
    }

    /// Two-line text of the record as first seeded.
    pub fn original_lines(&self) -> Result<(String, String), FitError> {
        let seeded = self.seeded()?;
        match &seeded.source_lines {
            Some(lines) => Ok(lines.clone()),
            None => self.slot.library().record_to_text(&seeded.original),
        }
    }

    /// Epoch of the record as first seeded, ds50.
    pub fn original_epoch(&self) -> Result<Ds50, FitError> {
        Ok(self.seeded()?.original.epoch())
    }

    // ---------------------------------------------------------------------------------------------
    // Truth data
    // ---------------------------------------------------------------------------------------------

    /// States of an arbitrary record at the given times.
    pub fn propagate_record(
        &mut self,
        record: &ElementRecord,
        times: &[Ds50],
    ) -> Result<Vec<EpochState>, FitError> {
        self.slot
            .with_loaded(record, |lib, handle| {
                times
                    .iter()
                    .map(|&t| {
                        lib.propagate(handle, t)
                            .map(|(position, velocity)| EpochState::new(t, position, velocity))
                    })
                    .collect::<Result<Vec<_>, FitError>>()
            })
            .and_then(|states| states)
    }

    /// State of the current seed at `ds50_utc`.
    pub fn seed_state_at(&mut self, ds50_utc: Ds50) -> Result<EpochState, FitError> {
        let seed = self.seeded()?.seed.clone();
        let mut states = self.propagate_record(&seed, &[ds50_utc])?;
        states.pop().ok_or(FitError::EmptyTruth)
    }

    /// Attach a dense ephemeris as truth and re-epoch the seed at the fit epoch sample.
    ///
    /// Arguments
    /// ---------
    /// * `samples`: states strictly increasing in time
    ///
    /// Errors
    /// ------
    /// * [`FitError::EmptyTruth`], [`FitError::NonMonotonicTruth`]
    /// * [`FitError::InvalidFitParameter`] if the configured epoch index is out of range
    pub fn set_ephemeris(&mut self, samples: Vec<EpochState>) -> Result<&mut Self, FitError> {
        self.seeded()?;
        if samples.is_empty() {
            return Err(FitError::EmptyTruth);
        }
        if let Some(index) = samples
            .iter()
            .tuple_windows()
            .position(|(a, b)| !(b.ds50_utc > a.ds50_utc))
        {
            return Err(FitError::NonMonotonicTruth { index: index + 1 });
        }

        let epoch_index = self
            .params
            .as_ref()
            .and_then(|p| p.epoch_index)
            .unwrap_or(samples.len() / 2);
        let epoch_state = samples.get(epoch_index).copied().ok_or_else(|| {
            FitError::InvalidFitParameter(format!(
                "epoch_index {epoch_index} out of range for {} samples",
                samples.len()
            ))
        })?;

        self.set_from_state(&epoch_state)?;
        info!(
            "ephemeris truth attached: {} samples, fit epoch ds50 {:.8}",
            samples.len(),
            epoch_state.ds50_utc
        );
        self.truth = Some(TruthSeries::Ephemeris(samples));
        Ok(self)
    }

    /// Attach as truth the seed's own ephemeris at `times`.
    pub fn set_ephemeris_from_seed(&mut self, times: &[Epoch]) -> Result<&mut Self, FitError> {
        let seed = self.seeded()?.seed.clone();
        let ds50: Vec<Ds50> = times.iter().map(epoch_to_ds50).collect();
        let samples = self.propagate_record(&seed, &ds50)?;
        self.set_ephemeris(samples)
    }

    /// Attach angle-only observations as truth.
    ///
    /// The observations are prepared (sorted, sensor positions, true-of-date angles), then the
    /// seed is propagated to the last observation time and re-epoched there.
    pub fn set_observations(
        &mut self,
        observations: Vec<Observation>,
    ) -> Result<&mut Self, FitError> {
        self.seeded()?;
        let prepared = prepare_observations(observations, self.slot.library())?;
        let epoch = prepared
            .last()
            .map(|o| o.ds50_utc)
            .ok_or(FitError::EmptyObservations)?;

        let state = self.seed_state_at(epoch)?;
        self.set_from_state(&state)?;
        info!(
            "angle truth attached: {} observations, fit epoch ds50 {:.8}",
            prepared.len(),
            epoch
        );
        self.truth = Some(TruthSeries::Angles(prepared));
        Ok(self)
    }

    pub fn truth(&self) -> Option<&TruthSeries> {
        self.truth.as_ref()
    }

    /// Residuals of the last converged angle fit.
    pub fn final_residuals(&self) -> Option<&[AngleResidual]> {
        self.final_residuals.as_deref()
    }

    pub fn last_fit(&self) -> Option<&FitResult> {
        self.last_fit.as_ref()
    }

    /// Score a candidate vector of active-field values against the truth.
    ///
    /// See [`objective::evaluate`].
    pub fn evaluate(&mut self, x: &[f64]) -> Result<f64, FitError> {
        objective::evaluate(x, self)
    }
}

fn write_mean_elements(
    record: &mut ElementRecord,
    epoch: Ds50,
    mean: &KeplerianSet,
    pair: &MeanMotionPair,
) {
    record[ElementField::Epoch] = epoch;
    record[ElementField::Inclination] = mean.inclination;
    record[ElementField::Node] = mean.node;
    record[ElementField::Eccentricity] = mean.eccentricity;
    record[ElementField::ArgPerigee] = mean.arg_perigee;
    record[ElementField::MeanAnomaly] = mean.mean_anomaly;
    record[ElementField::MeanMotion] = pair.for_kind(record.ephemeris_type.mean_motion_kind());
}

#[cfg(test)]
mod fit_session_test {
    use super::*;
    use crate::astrolib::SecularJ2;

    const L1: &str = "1 25544U 98067A   24365.67842578  .00000000  00000-0  00000-0 4  9991";
    const L2: &str = "2 25544  51.6404  61.8250 0005853  25.4579 117.0387 15.50482079489028";

    fn seeded_session() -> FitSession<SecularJ2> {
        let mut session = FitSession::new(SecularJ2::new());
        session.set_from_lines(L1, L2).unwrap();
        session
    }

    #[test]
    fn test_not_seeded() {
        let mut session = FitSession::new(SecularJ2::new());
        assert_eq!(session.set_type0().err(), Some(FitError::NotSeeded));
        assert_eq!(session.set_satno(1).err(), Some(FitError::NotSeeded));
        assert_eq!(session.initial_fields().err(), Some(FitError::NotSeeded));
        assert_eq!(session.fit().err(), Some(FitError::NotSeeded));
    }

    #[test]
    fn test_seed_from_lines() {
        let session = seeded_session();
        let seed = session.seed_record().unwrap();
        assert_eq!(seed.ephemeris_type, EphemerisType::Type4);
        assert_eq!(session.fields().unwrap(), &crate::element_record::FIT_TYPE4);
        assert_eq!(session.original_lines().unwrap(), (L1.to_string(), L2.to_string()));

        let pair = session.mean_motion().unwrap();
        assert_eq!(pair.kozai, 15.50482079);
        assert!(pair.brouwer < pair.kozai);
    }

    #[test]
    fn test_type_round_trip_is_exact() {
        let mut session = seeded_session();
        let before = session.seed_record().unwrap().clone();

        session.set_type0().unwrap();
        session.set_type2().unwrap();
        let type2 = session.seed_record().unwrap()[ElementField::MeanMotion];
        assert_eq!(type2, session.mean_motion().unwrap().brouwer);

        session.set_type4().unwrap();
        let after = session.seed_record().unwrap();
        assert_eq!(after[ElementField::MeanMotion], before[ElementField::MeanMotion]);
        assert_eq!(after.field_array(), before.field_array());
    }

    #[test]
    fn test_field_selection() {
        let mut session = seeded_session();
        session.set_type0().unwrap();
        assert_eq!(session.initial_fields().unwrap().len(), 7);

        assert_eq!(
            session.set_fields(&[ElementField::AgomGp]).err(),
            Some(FitError::FieldNotDefinedForType {
                field: ElementField::AgomGp,
                ephemeris_type: EphemerisType::Type0
            })
        );
        assert_eq!(
            session.set_fields(&[]).err(),
            Some(FitError::EmptyFieldSelection)
        );

        session
            .set_fields(&[ElementField::MeanAnomaly, ElementField::MeanMotion])
            .unwrap();
        assert_eq!(
            session.initial_fields().unwrap(),
            vec![117.0387, 15.50482079]
        );
    }

    #[test]
    fn test_setters_touch_seed_and_working() {
        let mut session = seeded_session();
        session
            .set_satno(77777)
            .unwrap()
            .set_agom(0.02)
            .unwrap();
        assert_eq!(session.seed_record().unwrap().sat_num, 77777);
        assert_eq!(session.working_record().unwrap().sat_num, 77777);
        assert_eq!(session.working_record().unwrap()[ElementField::AgomGp], 0.02);

        session.clear_nonconservatives().unwrap();
        assert_eq!(session.seed_record().unwrap()[ElementField::AgomGp], 0.0);

        let (l1, _) = session.lines().unwrap();
        assert!(l1.starts_with("1 77777U"));
    }

    #[test]
    fn test_seed_from_state() {
        let mut source = seeded_session();
        let epoch = source.seed_record().unwrap().epoch();
        let state = source.seed_state_at(epoch + 0.25).unwrap();

        let mut session = FitSession::new(SecularJ2::new());
        session
            .seed_from_state(&state, crate::constants::DEFAULT_FIT_SATNO, EphemerisType::Type2)
            .unwrap();
        let seed = session.seed_record().unwrap();
        assert_eq!(seed.epoch(), epoch + 0.25);
        assert_eq!(seed[ElementField::BStar], 0.0);
        assert_eq!(
            seed[ElementField::MeanMotion],
            session.mean_motion().unwrap().brouwer
        );
        approx::assert_relative_eq!(
            session.mean_motion().unwrap().kozai,
            15.50482079,
            epsilon = 1e-9
        );
        assert!(session.lines().unwrap().0.starts_with("1 99999U"));
        assert_eq!(session.fields().unwrap(), &crate::element_record::FIT_TYPE0);
    }

    #[test]
    fn test_non_monotonic_truth() {
        let mut session = seeded_session();
        let epoch = session.seed_record().unwrap().epoch();
        let seed = session.seed_record().unwrap().clone();
        let mut samples = session
            .propagate_record(&seed, &[epoch, epoch + 0.1, epoch + 0.2])
            .unwrap();
        samples.swap(1, 2);

        assert_eq!(
            session.set_ephemeris(samples).err(),
            Some(FitError::NonMonotonicTruth { index: 2 })
        );
        assert_eq!(session.set_ephemeris(Vec::new()).err(), Some(FitError::EmptyTruth));
    }

    #[test]
    fn test_unloadable_epoch_state_is_refused() {
        use crate::constants::GM_EARTH;
        use nalgebra::Vector3;

        let mut session = seeded_session();
        let before = session.seed_record().unwrap().clone();
        let epoch = before.epoch();
        let speed = (GM_EARTH / 5000.0).sqrt();
        let underground: Vec<EpochState> = (0..3)
            .map(|i| {
                let t = epoch + 0.01 * i as f64;
                EpochState::new(t, Vector3::new(5000.0, 0.0, 0.0), Vector3::new(0.0, speed, 0.0))
            })
            .collect();

        assert!(matches!(
            session.set_ephemeris(underground),
            Err(FitError::PropagatorInit(_))
        ));
        assert_eq!(session.seed_record().unwrap(), &before);
        assert_eq!(session.working_record().unwrap(), &before);
        assert!(session.truth().is_none());
    }

    #[test]
    fn test_set_ephemeris_re_epochs_seed() {
        let mut session = seeded_session();
        let epoch = session.seed_record().unwrap().epoch();
        let times: Vec<Ds50> = (0..5).map(|i| epoch + 0.25 * i as f64).collect();
        let seed = session.seed_record().unwrap().clone();
        let samples = session.propagate_record(&seed, &times).unwrap();

        session.set_ephemeris(samples).unwrap();
        let reepoched = session.seed_record().unwrap();
        assert_eq!(reepoched.epoch(), epoch + 0.5);
        assert_eq!(session.working_record().unwrap().epoch(), epoch + 0.5);
        assert_eq!(session.original_epoch().unwrap(), epoch);
        assert_eq!(session.truth().map(|t| t.len()), Some(5));
        assert_eq!(session.params(), FitParams::default());
    }
}
