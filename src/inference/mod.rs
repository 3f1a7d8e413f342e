//! inference — covariance, standard errors and derived quantities for a fit.
//!
//! Purpose
//! -------
//! Provide post-estimation uncertainty quantification on top of a fitted
//! household model: the observed-information covariance from a
//! finite-difference Hessian, multivariate-normal sampling, and the
//! epidemiological summaries reported with intervals.
//!
//! Key behaviors
//! -------------
//! - [`calc_covariance`] with a [`StepRule`] builds, symmetrizes and inverts
//!   the stencil Hessian of the penalized negative log-likelihood.
//! - [`MvnSampler`] and [`empirical_interval`] turn a covariance block into
//!   Monte Carlo percentile intervals, discarding non-finite draws.
//! - [`derive_all`] produces the external infection probability, secondary
//!   attack rates and relative age effects as [`Estimate`]s.
//! - [`InferenceError`] / [`InferenceResult`] cover step and level
//!   validation, singular Hessians and sampler inputs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters live in model space (the bounded space the estimator
//!   reports), not the optimizer's unconstrained space.
//! - All randomness is drawn from explicitly seeded `StdRng`s.
//!
//! Downstream usage
//! ----------------
//! - The analysis pipeline calls [`calc_covariance`] on
//!   `HouseholdModel::objective` at the selected estimate. On error it
//!   reports the failure and still calls [`derive_all`] with `cov = None`
//!   so point values are kept.

pub mod derived;
pub mod errors;
pub mod hessian;
pub mod sampling;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::derived::{
    DerivedOptions, Estimate, derive_all, external_infection, relative_effects,
    secondary_attack_rates, z_value,
};
pub use self::errors::{InferenceError, InferenceResult};
pub use self::hessian::{Covariance, StepRule, calc_covariance};
pub use self::sampling::{
    EmpiricalInterval, Factorization, MvnSampler, empirical_interval, percentile,
};

pub mod prelude {
    pub use super::derived::{DerivedOptions, Estimate, derive_all};
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::hessian::{Covariance, StepRule, calc_covariance};
}
