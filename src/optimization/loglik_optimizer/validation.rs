//! Validation helpers for log-likelihood optimization.
//!
//! Consistency checks shared across the optimizer interface:
//!
//! - **Tolerance checks**: [`verify_tol_grad`], [`verify_tol_cost`].
//! - **Gradient / Hessian validation**: [`validate_grad`], [`validate_hessian`]
//!   enforce shape and finite entries.
//! - **Estimates and values**: [`validate_theta_hat`], [`validate_value`].
//! - **Box constraints**: [`validate_bounds`], [`validate_start`] check the
//!   bound vectors and a start point against them.
//!
//! Every helper reports the first offending element through a dedicated
//! [`OptError`] variant.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{Grad, Theta, types::Hessian},
};
use ndarray::Array1;

/// Validate the optional gradient‐norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let t = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some((index, &value)) = t.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidThetaHat {
            index,
            value,
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(t)
}

/// Validate that a scalar objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate the shape and entries of a Hessian matrix.
///
/// # Errors
/// - [`OptError::HessianDimMismatch`] if dimensions are not `dim × dim`.
/// - [`OptError::InvalidHessian`] for the first non-finite entry.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    for ((i, j), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidHessian { row: i, col: j, value });
        }
    }
    Ok(())
}

/// Validate a pair of box-constraint vectors.
///
/// Both vectors must have the same length and every pair must be finite
/// with `lower < upper`.
///
/// # Errors
/// - [`OptError::BoundsDimMismatch`] on a length mismatch.
/// - [`OptError::InvalidBounds`] for the first offending index.
pub fn validate_bounds(lower: &Array1<f64>, upper: &Array1<f64>) -> OptResult<()> {
    if lower.len() != upper.len() {
        return Err(OptError::BoundsDimMismatch { lower: lower.len(), upper: upper.len() });
    }
    for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(OptError::InvalidBounds { index, lower: lo, upper: hi });
        }
    }
    Ok(())
}

/// Validate that `x0` has the right length and lies inside `[lower, upper]`.
///
/// Points exactly on a bound are accepted.
///
/// # Errors
/// - [`OptError::StartDimMismatch`] on a length mismatch.
/// - [`OptError::StartOutOfBounds`] for the first coordinate outside the box
///   (including `NaN`).
pub fn validate_start(x0: &Theta, lower: &Array1<f64>, upper: &Array1<f64>) -> OptResult<()> {
    if x0.len() != lower.len() {
        return Err(OptError::StartDimMismatch { expected: lower.len(), found: x0.len() });
    }
    for (index, ((&value, &lo), &hi)) in x0.iter().zip(lower.iter()).zip(upper.iter()).enumerate()
    {
        if !(lo..=hi).contains(&value) {
            return Err(OptError::StartOutOfBounds { index, value, lower: lo, upper: hi });
        }
    }
    Ok(())
}
