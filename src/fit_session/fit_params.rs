use std::cmp::Ordering::{Greater, Less};
use std::fmt;
use std::time::Duration;

use crate::constants::ARCSEC_TO_DEG;
use crate::fit_errors::FitError;
use crate::optimizer::NelderMead;

/// Configuration of a fit.
///
/// Fields
/// -----------------
/// * `simplex_delta`: relative step used to build the initial simplex, in `(0, 1)`.
/// * `xatol`: absolute tolerance on the simplex spread, in the units of the fitted fields.
/// * `fatol`: absolute tolerance on the spread of objective values.
/// * `max_iterations`: iteration cap, `200 × n_fields` when `None`.
/// * `max_evaluations`: objective evaluation cap, `200 × n_fields` when `None`.
/// * `max_duration`: optional wall-clock limit for one fit.
/// * `epoch_index`: index of the ephemeris sample used as fit epoch, middle sample when `None`.
///
/// Defaults
/// -----------------
/// * `simplex_delta`: 0.15
/// * `xatol`: 0.01
/// * `fatol`: 0.1 (the ephemeris objective is `sqrt(km)`)
///
/// Angle fits use [`FitParams::for_angles`], which loosens `xatol` to 0.10 and scales `fatol`
/// with the observation count: 30 arcseconds (in degrees) per observation.
///
/// See also
/// -----------------
/// * [`crate::fit_session::FitSession::fit`] – consumes these parameters.
/// * [`crate::fit_session::simplex::initial_simplex`] – uses `simplex_delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub simplex_delta: f64,
    pub xatol: f64,
    pub fatol: f64,
    pub max_iterations: Option<usize>,
    pub max_evaluations: Option<usize>,
    pub max_duration: Option<Duration>,
    pub epoch_index: Option<usize>,
}

impl FitParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`FitParamsBuilder`] starting from the defaults.
    pub fn builder() -> FitParamsBuilder {
        FitParamsBuilder::new()
    }

    /// Defaults for an angle-only fit over `n_obs` observations.
    pub fn for_angles(n_obs: usize) -> Self {
        FitParams {
            xatol: 0.10,
            fatol: 30.0 * ARCSEC_TO_DEG * n_obs as f64,
            ..Self::default()
        }
    }

    /// Minimizer configured for an `n`-dimensional search.
    pub fn nelder_mead(&self, n: usize) -> NelderMead {
        let mut nm = NelderMead::new(n, self.xatol, self.fatol);
        if let Some(it) = self.max_iterations {
            nm.max_iterations = it;
        }
        if let Some(fev) = self.max_evaluations {
            nm.max_evaluations = fev;
        }
        nm.max_duration = self.max_duration;
        nm
    }
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams {
            simplex_delta: 0.15,
            xatol: 0.01,
            fatol: 0.1,
            max_iterations: None,
            max_evaluations: None,
            max_duration: None,
            epoch_index: None,
        }
    }
}

/// Builder for [`FitParams`], with validation.
#[derive(Debug, Clone)]
pub struct FitParamsBuilder {
    params: FitParams,
}

impl Default for FitParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FitParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: FitParams::default(),
        }
    }

    /// Start from the angle-fit defaults for `n_obs` observations.
    pub fn for_angles(n_obs: usize) -> Self {
        Self {
            params: FitParams::for_angles(n_obs),
        }
    }

    pub fn simplex_delta(mut self, v: f64) -> Self {
        self.params.simplex_delta = v;
        self
    }
    pub fn xatol(mut self, v: f64) -> Self {
        self.params.xatol = v;
        self
    }
    pub fn fatol(mut self, v: f64) -> Self {
        self.params.fatol = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = Some(v);
        self
    }
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.params.max_evaluations = Some(v);
        self
    }
    pub fn max_duration(mut self, v: Duration) -> Self {
        self.params.max_duration = Some(v);
        self
    }
    pub fn epoch_index(mut self, v: usize) -> Self {
        self.params.epoch_index = Some(v);
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff a < b and comparable (i.e., not NaN).
    #[inline]
    fn lt(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less))
    }

    /// Validate and return the parameters.
    ///
    /// Errors
    /// -----------------
    /// * [`FitError::InvalidFitParameter`] when `simplex_delta ∉ (0, 1)`, a tolerance is not
    ///   strictly positive, or an iteration / evaluation cap is zero.
    pub fn build(self) -> Result<FitParams, FitError> {
        let p = &self.params;

        if !(Self::gt0(p.simplex_delta) && Self::lt(p.simplex_delta, 1.0)) {
            return Err(FitError::InvalidFitParameter(
                "simplex_delta must lie in (0, 1)".into(),
            ));
        }
        if !Self::gt0(p.xatol) {
            return Err(FitError::InvalidFitParameter("xatol must be > 0".into()));
        }
        if !Self::gt0(p.fatol) {
            return Err(FitError::InvalidFitParameter("fatol must be > 0".into()));
        }
        if p.max_iterations == Some(0) {
            return Err(FitError::InvalidFitParameter(
                "max_iterations must be >= 1".into(),
            ));
        }
        if p.max_evaluations == Some(0) {
            return Err(FitError::InvalidFitParameter(
                "max_evaluations must be >= 1".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for FitParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cap = |v: Option<usize>| v.map_or_else(|| "200n".to_string(), |v| v.to_string());
        if f.alternate() {
            const PARAM_COL: usize = 36;
            writeln!(f, "Fit Parameters")?;
            writeln!(f, "--------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            line!(
                "simplex_delta   = {:.3}",
                self.simplex_delta,
                "Relative step of the initial simplex"
            )?;
            line!("xatol           = {:e}", self.xatol, "Simplex spread tolerance")?;
            line!("fatol           = {:e}", self.fatol, "Objective spread tolerance")?;
            line!(
                "max_iterations  = {}",
                cap(self.max_iterations),
                "Iteration cap"
            )?;
            line!(
                "max_evaluations = {}",
                cap(self.max_evaluations),
                "Objective evaluation cap"
            )?;
            line!(
                "max_duration    = {}",
                self.max_duration
                    .map_or_else(|| "none".to_string(), |d| format!("{:.1} s", d.as_secs_f64())),
                "Wall-clock limit"
            )?;
            line!(
                "epoch_index     = {}",
                self.epoch_index
                    .map_or_else(|| "middle".to_string(), |i| i.to_string()),
                "Ephemeris sample used as fit epoch"
            )?;
            Ok(())
        } else {
            write!(
                f,
                "FitParams(delta={:.3}, xatol={:e}, fatol={:e}, max_it={}, max_fev={})",
                self.simplex_delta,
                self.xatol,
                self.fatol,
                cap(self.max_iterations),
                cap(self.max_evaluations)
            )
        }
    }
}
