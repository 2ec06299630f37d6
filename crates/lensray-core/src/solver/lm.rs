//! Levenberg-Marquardt damped least squares.
//!
//! The solver minimises the sum of squared residuals of an [`LmObjective`].
//! Each [`LmSolver::iterate`] call builds the normal equations
//! $\alpha = J^T J$, $\beta = -J^T r$ once and then tries steps
//! $\delta = (\alpha + \lambda I)^{-1}\beta$ with growing damping $\lambda$
//! until one is accepted or $\lambda$ reaches [`LAMBDA_MAX`].
//!
//! A step is judged by the relative rise
//! $(\text{sos} - \text{sos}_0) / (1 + \text{sos}_0)$:
//!
//! | rise | outcome |
//! |------|---------|
//! | $\le -\text{tol}$ | keep, shrink $\lambda$, [`LmStatus::Down`] |
//! | $(-\text{tol}, 0]$ | keep, shrink $\lambda$, [`LmStatus::Level`] |
//! | $(0, \text{tol})$ | undo, [`LmStatus::Level`] |
//! | $\ge \text{tol}$ | undo, grow $\lambda$, retry |
//!
//! Objectives signal an invalid state (a failed trace, say) by returning a
//! sum of squares of at least [`BIG_VAL`]; a step into such a state is
//! treated as uphill.

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::gauss_jordan;

/// Sentinel sum of squares for an unevaluable state.
pub const BIG_VAL: f64 = 1e20;
/// Damping at which an iteration gives up.
pub const LAMBDA_MAX: f64 = 1e3;
/// Damping of a fresh solver.
pub const LAMBDA_INITIAL: f64 = 1e-3;

const LAMBDA_SHRINK: f64 = 0.1;
const LAMBDA_GROW: f64 = 2.0;

/// A least-squares problem driven by [`LmSolver`].
///
/// The objective owns its parameter vector; [`nudge`](Self::nudge) is the
/// only way the solver changes it.
pub trait LmObjective {
    /// Evaluate residuals at the current parameters and return their sum
    /// of squares, or [`BIG_VAL`] if they cannot be evaluated.
    fn compute_residuals(&mut self) -> f64;

    /// Rebuild the Jacobian at the current parameters. Returns `false` on
    /// failure. Cached residuals must describe the current parameters on
    /// return.
    fn build_jacobian(&mut self) -> bool;

    /// Residual `i` from the last evaluation.
    fn residual(&self, i: usize) -> f64;

    /// $\partial r_i / \partial p_j$ from the last Jacobian build.
    fn jacobian(&self, i: usize, j: usize) -> f64;

    /// Add `delta` to the parameters, re-evaluate and return the new sum
    /// of squares ([`BIG_VAL`] if invalid).
    fn nudge(&mut self, delta: &[f64]) -> f64;
}

/// Whether a sum of squares marks an invalid state.
pub fn is_bad(sos: f64) -> bool {
    !sos.is_finite() || sos >= BIG_VAL
}

/// Outcome of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LmStatus {
    /// Significant progress; keep iterating.
    Down,
    /// No significant progress possible; converged.
    Level,
    /// The iteration budget ran out.
    MaxIter,
    /// The iteration failed.
    Bad,
}

/// Why an iteration returned [`LmStatus::Bad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadReason {
    /// The starting residuals could not be evaluated.
    InvalidResiduals,
    /// The Jacobian build failed.
    JacobianFailed,
    /// $\alpha + \lambda I$ had a zero determinant.
    SingularMatrix,
    /// Every step up to [`LAMBDA_MAX`] went uphill.
    LambdaExhausted,
}

/// Summary of a [`LmSolver::solve`] run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LmReport {
    pub status: LmStatus,
    pub iterations: usize,
    pub sum_of_squares: f64,
    pub lambda: f64,
    pub reason: Option<BadReason>,
}

/// Levenberg-Marquardt iteration over a borrowed objective.
pub struct LmSolver<'a, O: LmObjective + ?Sized> {
    objective: &'a mut O,
    tolerance: f64,
    n_params: usize,
    n_residuals: usize,
    lambda: f64,
    sum_of_squares: f64,
    reason: Option<BadReason>,
}

impl<'a, O: LmObjective + ?Sized> LmSolver<'a, O> {
    pub fn new(objective: &'a mut O, tolerance: f64, n_params: usize, n_residuals: usize) -> Self {
        Self {
            objective,
            tolerance,
            n_params,
            n_residuals,
            lambda: LAMBDA_INITIAL,
            sum_of_squares: BIG_VAL,
            reason: None,
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Sum of squares at the parameters left by the last iteration.
    pub fn sum_of_squares(&self) -> f64 {
        self.sum_of_squares
    }

    /// Reason for the last [`LmStatus::Bad`], if any.
    pub fn bad_reason(&self) -> Option<BadReason> {
        self.reason
    }

    /// Run one iteration.
    pub fn iterate(&mut self) -> LmStatus {
        self.reason = None;
        let sos_init = self.objective.compute_residuals();
        if is_bad(sos_init) {
            return self.bad(BadReason::InvalidResiduals);
        }
        if !self.objective.build_jacobian() {
            return self.bad(BadReason::JacobianFailed);
        }
        self.sum_of_squares = sos_init;

        let (m, n) = (self.n_residuals, self.n_params);
        let jac = Array2::from_shape_fn((m, n), |(i, j)| self.objective.jacobian(i, j));
        let res = Array1::from_shape_fn(m, |i| self.objective.residual(i));
        let alpha = jac.t().dot(&jac);
        let beta = -jac.t().dot(&res);

        while self.lambda < LAMBDA_MAX {
            let mut damped = alpha.clone();
            for k in 0..n {
                damped[[k, k]] += self.lambda;
            }
            if gauss_jordan::invert(&mut damped) == 0.0 {
                log::warn!("LM: singular normal matrix at lambda = {:.3e}", self.lambda);
                return self.bad(BadReason::SingularMatrix);
            }
            let delta = damped.dot(&beta).to_vec();

            let sos = self.objective.nudge(&delta);
            let rise = if is_bad(sos) {
                f64::INFINITY
            } else {
                (sos - sos_init) / (1.0 + sos_init)
            };

            if rise <= 0.0 {
                self.lambda *= LAMBDA_SHRINK;
                self.sum_of_squares = sos;
                return if rise <= -self.tolerance {
                    LmStatus::Down
                } else {
                    LmStatus::Level
                };
            }

            let undo: Vec<f64> = delta.iter().map(|d| -d).collect();
            self.objective.nudge(&undo);
            if rise < self.tolerance {
                return LmStatus::Level;
            }
            self.lambda *= LAMBDA_GROW;
        }
        self.bad(BadReason::LambdaExhausted)
    }

    /// Iterate until the status is no longer [`LmStatus::Down`] or
    /// `max_iterations` iterations have run.
    pub fn solve(&mut self, max_iterations: usize) -> LmReport {
        for iteration in 1..=max_iterations {
            let status = self.iterate();
            log::debug!(
                "LM iteration {iteration}: {status:?}, sos = {:.6e}, lambda = {:.3e}",
                self.sum_of_squares,
                self.lambda
            );
            if status != LmStatus::Down {
                return self.report(status, iteration);
            }
        }
        self.report(LmStatus::MaxIter, max_iterations)
    }

    fn report(&self, status: LmStatus, iterations: usize) -> LmReport {
        LmReport {
            status,
            iterations,
            sum_of_squares: self.sum_of_squares,
            lambda: self.lambda,
            reason: self.reason,
        }
    }

    fn bad(&mut self, reason: BadReason) -> LmStatus {
        self.reason = Some(reason);
        LmStatus::Bad
    }
}
