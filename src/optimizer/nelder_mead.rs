//! Downhill simplex (Nelder–Mead) with absolute `xatol` / `fatol` termination.
//!
//! Coefficients are the standard ones: reflection ρ = 1, expansion χ = 2,
//! contraction ψ = 1/2, shrink σ = 1/2. Ties are broken toward the first vertex,
//! NaN objective values are treated as `+∞`. A simplex whose best value is `+∞` never
//! counts as converged.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use std::time::{Duration, Instant};

use super::{MinimizeOutcome, Termination};
use crate::fit_errors::FitError;

const RHO: f64 = 1.0;
const CHI: f64 = 2.0;
const PSI: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Nelder–Mead configuration.
///
/// Convergence requires **both**
/// * `max_i ‖x_i − x_best‖_∞ ≤ xatol` over the simplex vertices, and
/// * `max_i |f_i − f_best| ≤ fatol`.
///
/// Iteration, evaluation and wall-clock guards stop the search otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    pub xatol: f64,
    pub fatol: f64,
    pub max_iterations: usize,
    pub max_evaluations: usize,
    pub max_duration: Option<Duration>,
}

impl NelderMead {
    /// Defaults for an `n`-dimensional problem: `200 n` iterations and evaluations.
    pub fn new(n: usize, xatol: f64, fatol: f64) -> Self {
        NelderMead {
            xatol,
            fatol,
            max_iterations: 200 * n.max(1),
            max_evaluations: 200 * n.max(1),
            max_duration: None,
        }
    }

    /// Minimize `f` starting from `initial_simplex`.
    ///
    /// Arguments
    /// ---------
    /// * `f`: objective, called once per vertex evaluation; an `Err` aborts the search
    /// * `initial_simplex`: `(n + 1) × n` matrix, one vertex per row
    ///
    /// Return
    /// ------
    /// * the [`MinimizeOutcome`]; a non-converged search is reported through
    ///   [`MinimizeOutcome::termination`], not as an error
    /// * [`FitError::InvalidFitParameter`] if the simplex shape is wrong
    /// * the first error returned by `f`
    pub fn minimize<F>(&self, mut f: F, initial_simplex: &DMatrix<f64>) -> Result<MinimizeOutcome, FitError>
    where
        F: FnMut(&DVector<f64>) -> Result<f64, FitError>,
    {
        let n = initial_simplex.ncols();
        if n == 0 || initial_simplex.nrows() != n + 1 {
            return Err(FitError::InvalidFitParameter(format!(
                "initial simplex must be (n + 1) x n, got {} x {}",
                initial_simplex.nrows(),
                n
            )));
        }

        let start = Instant::now();
        let mut evaluations = 0usize;
        let mut evaluate = |x: &DVector<f64>, evaluations: &mut usize| -> Result<f64, FitError> {
            *evaluations += 1;
            let value = f(x)?;
            Ok(if value.is_nan() { f64::INFINITY } else { value })
        };

        let mut sim: Vec<DVector<f64>> = initial_simplex
            .row_iter()
            .map(|row| row.transpose())
            .collect();
        let mut fsim: Vec<f64> = Vec::with_capacity(n + 1);
        for vertex in &sim {
            fsim.push(evaluate(vertex, &mut evaluations)?);
        }
        sort_simplex(&mut sim, &mut fsim);

        let mut iterations = 1usize;
        let mut timed_out = false;

        while evaluations < self.max_evaluations && iterations < self.max_iterations {
            if self.within_tolerance(&sim, &fsim) {
                break;
            }
            if let Some(limit) = self.max_duration {
                if start.elapsed() >= limit {
                    timed_out = true;
                    break;
                }
            }

            let worst = sim[n].clone();
            let centroid = sim[..n]
                .iter()
                .fold(DVector::zeros(n), |acc, v| acc + v)
                / n as f64;

            let xr = &centroid * (1.0 + RHO) - &worst * RHO;
            let fxr = evaluate(&xr, &mut evaluations)?;
            let mut shrink = false;

            if fxr < fsim[0] {
                let xe = &centroid * (1.0 + RHO * CHI) - &worst * (RHO * CHI);
                let fxe = evaluate(&xe, &mut evaluations)?;
                if fxe < fxr {
                    sim[n] = xe;
                    fsim[n] = fxe;
                } else {
                    sim[n] = xr;
                    fsim[n] = fxr;
                }
            } else if fxr < fsim[n - 1] {
                sim[n] = xr;
                fsim[n] = fxr;
            } else if fxr < fsim[n] {
                // outside contraction
                let xc = &centroid * (1.0 + PSI * RHO) - &worst * (PSI * RHO);
                let fxc = evaluate(&xc, &mut evaluations)?;
                if fxc <= fxr {
                    sim[n] = xc;
                    fsim[n] = fxc;
                } else {
                    shrink = true;
                }
            } else {
                // inside contraction
                let xcc = &centroid * (1.0 - PSI) + &worst * PSI;
                let fxcc = evaluate(&xcc, &mut evaluations)?;
                if fxcc < fsim[n] {
                    sim[n] = xcc;
                    fsim[n] = fxcc;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                trace!("simplex shrink at iteration {iterations}");
                let best = sim[0].clone();
                for j in 1..=n {
                    sim[j] = &best + (&sim[j] - &best) * SIGMA;
                    fsim[j] = evaluate(&sim[j], &mut evaluations)?;
                }
            }

            iterations += 1;
            sort_simplex(&mut sim, &mut fsim);
        }

        let termination = if timed_out {
            Termination::TimedOut
        } else if self.within_tolerance(&sim, &fsim) {
            Termination::Converged
        } else if evaluations >= self.max_evaluations {
            Termination::MaxEvaluations
        } else {
            Termination::MaxIterations
        };
        debug!(
            "nelder-mead stopped after {iterations} iterations, {evaluations} evaluations: {termination}"
        );

        Ok(MinimizeOutcome {
            x: sim.swap_remove(0),
            fun: fsim[0],
            iterations,
            evaluations,
            termination,
        })
    }

    fn within_tolerance(&self, sim: &[DVector<f64>], fsim: &[f64]) -> bool {
        if !fsim[0].is_finite() {
            return false;
        }
        let x_spread = sim[1..]
            .iter()
            .map(|v| (v - &sim[0]).amax())
            .fold(0.0, f64::max);
        let f_within = fsim[1..]
            .iter()
            .all(|fi| (fsim[0] - fi).abs() <= self.fatol);
        x_spread <= self.xatol && f_within
    }
}

/// Stable sort of the vertices by objective value.
fn sort_simplex(sim: &mut Vec<DVector<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    *sim = order.iter().map(|&i| sim[i].clone()).collect();
    *fsim = order.iter().map(|&i| fsim[i]).collect();
}
