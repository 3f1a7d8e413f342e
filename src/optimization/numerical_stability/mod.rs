//! numerical_stability — guarded transforms and shared numeric tolerances.
//!
//! Purpose
//! -------
//! Collect the numerically stable scalar transforms used to map the
//! optimizer's unconstrained parameters into box-bounded model space, plus
//! the small tolerances shared by the optimizer and the inference layer.
//!
//! Key behaviors
//! -------------
//! - Provide a stable logistic / logit pair (`safe_logistic`,
//!   `safe_logit`) for the box-constraint reparameterization
//!   `x = lo + (hi - lo)·σ(θ)`.
//! - Provide the bounded arctangent squash (`arctan_squash`) used for the
//!   household-size scaling exponent.
//! - Centralize tolerances (`LOGIT_EPS`, `EIGEN_EPS`, `GENERAL_TOL`) so that
//!   clamping and singularity checks agree across modules.
//!
//! Conventions
//! -----------
//! - Pure functions on `f64`; no logging, no I/O, no global state.
//! - Inputs are assumed finite; validation happens upstream.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] check agreement with the naive
//!   formulas on safe grids, saturation in the tails, and inversion.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, GENERAL_TOL, LOGIT_EPS, arctan_squash, safe_logistic, safe_logit,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, GENERAL_TOL, LOGIT_EPS, arctan_squash, safe_logistic, safe_logit,
    };
}
