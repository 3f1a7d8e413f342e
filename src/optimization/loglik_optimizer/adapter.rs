//! Adapters that expose a `LogLikelihood` as an `argmin` problem.
//!
//! We convert a *maximization* of a log-likelihood `ℓ(θ)` into a *minimization*
//! problem by defining the cost as `c(θ) = -ℓ(θ)`.
//!
//! - [`ArgMinAdapter`] is used by gradient-based solvers. Point failures
//!   (non-finite values, [`OptError::NumericalFailure`]) become `+∞` so an
//!   Armijo backtracking line search can shrink the step. Any other error
//!   (shape or configuration faults) aborts the run.
//! - [`SimplexAdapter`] is used by Nelder–Mead. Every failed or non-finite
//!   evaluation becomes `+∞` so the simplex can reject the point and keep
//!   going; `NaN` never reaches the solver's cost ordering.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        finite_diff::run_fd_diff,
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a `LogLikelihood` to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `-ℓ(θ)`.
/// - `Gradient::gradient` returns `-∇ℓ(θ)` if the model provides an
///   analytic gradient, or a finite-difference gradient of the cost.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate the cost `c(θ) = -ℓ(θ)`, or `+∞` where the model cannot be
    /// evaluated.
    ///
    /// # Errors
    /// - Propagates every `OptError` from the model's `value` for which
    ///   [`OptError::is_point_failure`] is false.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.f.value(theta, self.data) {
            Ok(v) if v.is_finite() => Ok(-v),
            Ok(v) => {
                log::debug!("non-finite log-likelihood {v} treated as +inf cost");
                Ok(f64::INFINITY)
            }
            Err(e) if e.is_point_failure() => {
                log::debug!("{e}; treated as +inf cost");
                Ok(f64::INFINITY)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate the gradient of the cost at `θ`.
    ///
    /// Without an analytic gradient, central differences of the cost are
    /// tried first. If any cost evaluation failed, or the result is not
    /// finite (a stencil point fell on a `+∞` cost), the computation is
    /// redone once with forward differences via [`run_fd_diff`], which
    /// surfaces the captured error or the invalid gradient if it recurs.
    ///
    /// The FD closure must return `f64`, so the first evaluation error is
    /// parked in `closure_err` and `NaN` is returned in its place.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(theta, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Cost-only bridge for derivative-free solvers.
///
/// `cost(θ) = -ℓ(θ)` when the evaluation succeeds with a finite value,
/// `+∞` otherwise. Failures are logged at `debug` level.
#[derive(Debug, Clone)]
pub struct SimplexAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> SimplexAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for SimplexAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        match self.f.value(theta, self.data) {
            Ok(v) if v.is_finite() => Ok(-v),
            Ok(v) => {
                log::debug!("non-finite log-likelihood {v} treated as +inf cost");
                Ok(f64::INFINITY)
            }
            Err(e) => {
                log::debug!("log-likelihood evaluation failed ({e}); treated as +inf cost");
                Ok(f64::INFINITY)
            }
        }
    }
}
