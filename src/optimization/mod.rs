//! optimization — MLE stack, bounded multi-start fitting, and error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer for model fitting: an Argmin-backed
//! log-likelihood optimizer, box constraints with random restarts,
//! numerically stable transforms, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing log-likelihoods** `ℓ(θ)`
//!   (`loglik_optimizer`), including solver choice and stopping criteria.
//! - Fit inside a box from a fixed start or with seeded restarts and pick
//!   the best successful run (`multistart`).
//! - Supply shared numerical primitives (`numerical_stability`) for the
//!   logistic box transform and the household-size exponent squash.
//! - Normalize configuration issues, numerical failures, model errors and
//!   backend solver errors into `errors::OptError` / `OptResult<T>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Solvers operate in an unconstrained space `θ`; model code only ever
//!   sees points inside its box.
//! - Model-layer failures reach this layer as `OptError` values through
//!   `From<ModelError>`, never as panics.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; bounded fits
//!   report the cost (`objective = -ℓ`), which for the household model is
//!   the penalized negative log-likelihood.
//! - This layer logs through the `log` facade only (`debug` per run,
//!   `info` for the selected run, `warn` for failed runs).
//!
//! Downstream usage
//! ----------------
//! - The analysis pipeline calls `multistart::multistart` with the
//!   household model, its default bounds and the configured options.
//! - Front-ends can import the curated surface via `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Submodule unit tests cover solver wiring, the box transform, the
//!   stencil Hessian and restart selection on toy objectives.

pub mod errors;
pub mod loglik_optimizer;
pub mod multistart;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::multistart::{
        BoundedFit, MultiStartOptions, MultiStartOutcome, fit_bounded, multistart,
    };
    pub use super::numerical_stability::prelude::*;
}
