//! # Derivative-free minimization
//!
//! The fit objectives are non-smooth in practice: element sets the propagator rejects score
//! `+∞`, and residuals are reduced through square roots of sums of norms. A downhill simplex
//! search (Nelder–Mead) copes with both and needs nothing but function values.
//!
//! - [`NelderMead`] – the minimizer, configured with absolute tolerances and stop guards.
//! - [`MinimizeOutcome`] – best point, best value, counters and [`Termination`] reason.
//!
//! The caller supplies the full starting simplex (`n + 1` rows of `n` columns); see
//! [`crate::fit_session::simplex::initial_simplex`].

pub mod nelder_mead;

use nalgebra::DVector;
use std::fmt;

pub use nelder_mead::NelderMead;

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Both the simplex spread and the value spread fell within tolerance.
    Converged,
    MaxIterations,
    MaxEvaluations,
    TimedOut,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::Converged => "optimization terminated successfully",
            Termination::MaxIterations => "maximum number of iterations has been exceeded",
            Termination::MaxEvaluations => {
                "maximum number of function evaluations has been exceeded"
            }
            Termination::TimedOut => "wall-clock limit reached",
        };
        f.write_str(text)
    }
}

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOutcome {
    /// Best vertex found
    pub x: DVector<f64>,
    /// Objective value at `x`
    pub fun: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

impl MinimizeOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}
