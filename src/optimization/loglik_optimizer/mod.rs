//! loglik_optimizer — argmin-powered log-likelihood optimizer.
//!
//! Purpose
//! -------
//! Provide an Argmin-backed optimization layer for **maximizing
//! log-likelihoods** `ℓ(θ)`. Models implement a single trait,
//! [`LogLikelihood`], and invoke [`maximize`] to run L-BFGS (with a
//! configurable line search and finite-difference gradients) or the
//! derivative-free Nelder–Mead simplex.
//!
//! Key behaviors
//! -------------
//! - Convert log-likelihoods `ℓ(θ)` into Argmin cost functions
//!   `c(θ) = -ℓ(θ)` via [`adapter`].
//! - Expose [`maximize`], which validates the initial guess with
//!   [`LogLikelihood::check`], builds the configured solver via
//!   [`builders`], runs it via [`run`] and normalizes the result into an
//!   [`OptimOutcome`].
//! - Enforce box constraints through the logistic reparameterization in
//!   [`bounds`].
//! - Provide finite-difference helpers in [`finite_diff`]: gradients for
//!   the optimizer and the stencil Hessian used for standard errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** `ℓ(θ)` by minimizing `-ℓ(θ)`.
//! - [`LogLikelihood::value`] reports invalid inputs as [`OptError`]
//!   values, not panics.
//! - Configuration types ([`Tolerances`], [`MLEOptions`]) are validated on
//!   construction.
//!
//! Conventions
//! -----------
//! - Solvers see unconstrained [`Theta`]; mapping to bounded model space is
//!   done by [`bounds::BoxConstrained`].
//! - Diagnostics, including [`OptimOutcome::value`], are in terms of `ℓ`.
//! - Errors bubble up as [`OptResult<T>`]; this module never intentionally
//!   panics.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions and failure handling
//!   in [`adapter`], solver construction in [`builders`], the stencil in
//!   [`finite_diff`], the box transform in [`bounds`] and end-to-end
//!   convergence of each solver on a quadratic in [`api`].
//!
//! [`OptError`]: crate::optimization::errors::OptError
//! [`OptResult<T>`]: crate::optimization::errors::OptResult

pub mod adapter;
pub mod api;
pub mod bounds;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::bounds::{Bounds, BoxConstrained};
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Solver, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, DEFAULT_SIMPLEX_STEP, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::bounds::{Bounds, BoxConstrained};
    pub use super::traits::{
        LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Solver, Tolerances,
    };
    pub use super::types::{Cost, Grad, Theta};
}
