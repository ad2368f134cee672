//! Optimizer driver: runs Nelder–Mead over the active fields and publishes the result.

use std::fmt;

use hifitime::Epoch;
use log::{info, warn};

use super::objective::{angle_residual_table, evaluate};
use super::simplex::initial_simplex;
use super::FitSession;
use crate::astrolib::AstroLibrary;
use crate::constants::Ds50;
use crate::element_record::{ElementField, ElementRecord};
use crate::fit_errors::FitError;
use crate::optimizer::Termination;
use crate::time::ds50_to_epoch;

/// Outcome of one optimizer run.
///
/// Fields
/// -----------------
/// * `converged`: both tolerances were met
/// * `termination`: why the minimizer stopped
/// * `cost`: best objective value (`sqrt(km)` for ephemeris fits, degrees for angle fits).
///   It always belongs to `best`; after a non-converged fit it does not describe `record`.
/// * `record`: the best record when converged, otherwise the last-evaluated working record
///   (rebuild it from `best` and `fields` to recover the best candidate)
/// * `best`: best active-field values found
/// * `fields`: active fields, in the order of `best`
/// * `points`: number of truth samples
/// * `span`: first and last truth times, ds50
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub converged: bool,
    pub termination: Termination,
    pub cost: f64,
    pub record: ElementRecord,
    pub best: Vec<f64>,
    pub fields: Vec<ElementField>,
    pub iterations: usize,
    pub evaluations: usize,
    pub points: usize,
    pub span: (Ds50, Ds50),
}

/// Human-readable report of the last fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub input_lines: (String, String),
    pub output_lines: (String, String),
    pub fields: Vec<ElementField>,
    pub start: Epoch,
    pub end: Epoch,
    pub points: usize,
    pub rms: f64,
    pub rms_per_point: f64,
    pub converged: bool,
}

impl<L: AstroLibrary> FitSession<L> {
    /// Fit the active fields of the seed to the attached truth.
    ///
    /// The initial simplex is built around the seed values with
    /// [`initial_simplex`]; the minimizer is configured by [`FitSession::params`].
    ///
    /// On convergence the working record is rebuilt from the seed (unselected fields) and the
    /// best vector (active fields). Otherwise the working record keeps the last candidate the
    /// objective tried and the result is flagged `converged == false`; it is never promoted.
    ///
    /// Return
    /// ------
    /// * the [`FitResult`], also kept in [`FitSession::last_fit`]
    /// * [`FitError::NotSeeded`] / [`FitError::NoTruthData`] when the session is not ready;
    ///   candidates the library rejects score `+∞` and never abort the fit
    pub fn fit(&mut self) -> Result<FitResult, FitError> {
        let x0 = self.initial_fields()?;
        let fields = self.fields()?.to_vec();
        let (points, span) = match &self.truth {
            Some(truth) => (truth.len(), truth.span()),
            None => return Err(FitError::NoTruthData),
        };
        let params = self.params();

        info!(
            "fitting {} fields [{}] over {points} points, ds50 {:.6} to {:.6}",
            fields.len(),
            fields.iter().map(|f| f.mnemonic()).collect::<Vec<_>>().join(", "),
            span.0,
            span.1
        );

        let simplex = initial_simplex(&x0, params.simplex_delta);
        let outcome = params
            .nelder_mead(fields.len())
            .minimize(|x| evaluate(x.as_slice(), self), &simplex)?;
        let converged = outcome.converged();
        let best = outcome.x.as_slice().to_vec();

        if converged {
            self.reset_working()?;
            let seeded = self.seeded_mut()?;
            seeded.working.apply(&fields, &best)?;
            info!(
                "fit converged: cost {:.6} after {} iterations, {} evaluations",
                outcome.fun, outcome.iterations, outcome.evaluations
            );
        } else {
            warn!(
                "fit did not converge ({}): best cost {:.6} after {} evaluations",
                outcome.termination, outcome.fun, outcome.evaluations
            );
        }

        self.final_residuals = if converged && self.truth.as_ref().is_some_and(|t| t.is_angles())
        {
            Some(angle_residual_table(self)?)
        } else {
            None
        };

        let result = FitResult {
            converged,
            termination: outcome.termination,
            cost: outcome.fun,
            record: self.working_record()?.clone(),
            best,
            fields,
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            points,
            span,
        };
        self.last_fit = Some(result.clone());
        Ok(result)
    }

    /// Report of the last fit: input and output text, fitted fields, time span and costs.
    ///
    /// Return
    /// ------
    /// * [`FitError::NoFitResult`] before the first fit
    pub fn summarize(&self) -> Result<FitSummary, FitError> {
        let result = self.last_fit.as_ref().ok_or(FitError::NoFitResult)?;
        let output_lines = self.slot.library().record_to_text(&result.record)?;
        Ok(FitSummary {
            input_lines: self.original_lines()?,
            output_lines,
            fields: result.fields.clone(),
            start: ds50_to_epoch(result.span.0),
            end: ds50_to_epoch(result.span.1),
            points: result.points,
            rms: result.cost,
            rms_per_point: result.cost / result.points.max(1) as f64,
            converged: result.converged,
        })
    }
}

impl fmt::Display for FitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input:")?;
        writeln!(f, "{}", self.input_lines.0)?;
        writeln!(f, "{}", self.input_lines.1)?;
        writeln!(f, "Output:")?;
        writeln!(f, "{}", self.output_lines.0)?;
        writeln!(f, "{}", self.output_lines.1)?;
        writeln!(
            f,
            "Fields: {}",
            self.fields
                .iter()
                .map(|f| f.mnemonic())
                .collect::<Vec<_>>()
                .join(" ")
        )?;
        writeln!(f, "Start:  {}", self.start)?;
        writeln!(f, "End:    {}", self.end)?;
        writeln!(f, "Points: {}", self.points)?;
        writeln!(f, "RMS:    {:.6}", self.rms)?;
        write!(
            f,
            "RMS/pt: {:.6e}{}",
            self.rms_per_point,
            if self.converged { "" } else { "  (not converged)" }
        )
    }
}
