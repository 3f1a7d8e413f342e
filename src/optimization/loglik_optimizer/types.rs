//! loglik_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used by the
//! log-likelihood optimizer so the rest of the optimization code can stay
//! agnostic to `ndarray` and Argmin generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for parameter vectors, gradients,
//!   Hessians, and scalar costs (`Theta`, `Grad`, `Hessian`, `Cost`).
//! - Provide a standard map type for Argmin function-evaluation counters
//!   (`FnEvalMap`).
//! - Expose pre-wired solver aliases: L-BFGS with each line search and
//!   the derivative-free Nelder–Mead simplex.
//!
//! Invariants & assumptions
//! ------------------------
//! - All optimizer vectors and matrices are `ndarray` containers over `f64`.
//! - `Cost` is a scalar `f64`; higher layers handle the sign flip between
//!   cost and log-likelihood.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` are column vectors with length equal to the number
//!   of free parameters.
//! - `DEFAULT_LBFGS_MEM` and `DEFAULT_SIMPLEX_STEP` are defaults; callers
//!   override them through [`MLEOptions`](super::MLEOptions).
//!
//! Testing notes
//! -------------
//! - Aliases and constants only; exercised through the solver modules.
use argmin::solver::{
    linesearch::{BacktrackingLineSearch, HagerZhangLineSearch, MoreThuenteLineSearch, condition::ArmijoCondition},
    neldermead::NelderMead,
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` for log-likelihood optimization.
pub type Theta = Array1<f64>;

/// Gradient vector `∇ℓ(θ)` or `∇c(θ)`, matching the shape of `Theta`.
pub type Grad = Array1<f64>;

/// Dense Hessian matrix; `n × n` for `n = Theta.len()`.
pub type Hessian = Array2<f64>;

/// Scalar objective value used by the optimizer.
///
/// In this crate, this is the cost `c(θ) = -ℓ(θ)` derived from a
/// log-likelihood `ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps counter names (e.g., `"cost_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Default edge length of the initial Nelder–Mead simplex in `θ` space.
pub const DEFAULT_SIMPLEX_STEP: f64 = 0.5;

/// Hager–Zhang line search specialized to this crate’s numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate’s numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// Armijo backtracking line search; only needs costs at trial points, so
/// a `+∞` trial just halves the step.
pub type BacktrackingLS = BacktrackingLineSearch<Theta, Grad, ArmijoCondition<Cost>, Cost>;

/// Sufficient-decrease constant of the Armijo condition.
pub const ARMIJO_C: f64 = 1e-4;

/// Step contraction factor of the backtracking line search.
pub const BACKTRACKING_RHO: f64 = 0.5;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the Armijo backtracking line search.
pub type LbfgsBacktracking = LBFGS<BacktrackingLS, Theta, Grad, Cost>;

/// Nelder–Mead simplex over `Theta`.
pub type NelderMeadSimplex = NelderMead<Theta, Cost>;
