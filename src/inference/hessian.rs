//! inference::hessian — observed-information covariance at an estimate.
//!
//! Purpose
//! -------
//! Turn a scalar objective (the penalized negative log-likelihood) into a
//! covariance matrix and standard errors at a fitted point, using the
//! finite-difference stencil Hessian and a `nalgebra` inverse.
//!
//! Key behaviors
//! -------------
//! - [`StepRule`] sets per-coordinate steps `h_j = max(rel·|x̂_j|, min_step)`
//!   so coordinates estimated at zero still get a usable step.
//! - [`calc_covariance`] builds the Hessian with
//!   [`stencil_hessian`], symmetrizes it, checks its eigenvalues and
//!   inverts it.
//! - Standard errors are `sqrt(diag(Σ))`; a non-positive variance gives
//!   `None` for that parameter and a `warn!`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The objective is a *cost* (minimized at `x̂`), so its Hessian is the
//!   observed information and its inverse the covariance.
//! - A Hessian whose smallest absolute eigenvalue is at most
//!   `EIGEN_EPS · max(1, largest absolute eigenvalue)` is treated as
//!   singular; no pseudoinverse is attempted.
//!
//! Conventions
//! -----------
//! - Parameters live in model space, the same space the bounds are stated
//!   in; no Jacobian of the box transform is applied.
//! - Failures are [`InferenceError`]s. Callers keep the point estimate and
//!   withhold intervals.
//!
//! Testing notes
//! -------------
//! - Unit tests recover the inverse of a known quadratic form, check the
//!   step floor, and exercise the singular and non-finite paths.
use log::warn;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::{
        loglik_optimizer::finite_diff::{stencil_hessian, symmetrize_hess},
        numerical_stability::EIGEN_EPS,
    },
};

/// Per-coordinate finite-difference step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRule {
    /// Step as a fraction of `|x̂_j|`.
    pub relative: f64,
    /// Lower bound for every step.
    pub min_step: f64,
}

impl Default for StepRule {
    fn default() -> Self {
        Self { relative: 1e-2, min_step: 1e-4 }
    }
}

impl StepRule {
    /// # Errors
    /// - [`InferenceError::InvalidStepRule`] unless both values are finite
    ///   and `> 0`.
    pub fn new(relative: f64, min_step: f64) -> InferenceResult<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !(ok(relative) && ok(min_step)) {
            return Err(InferenceError::InvalidStepRule { relative, min_step });
        }
        Ok(Self { relative, min_step })
    }

    pub fn steps(&self, x_hat: &Array1<f64>) -> Array1<f64> {
        x_hat.mapv(|v| (self.relative * v.abs()).max(self.min_step))
    }
}

/// Hessian, its inverse, and the derived standard errors at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance {
    pub hessian: Array2<f64>,
    pub matrix: Array2<f64>,
    /// `None` where the variance is not positive.
    pub standard_errors: Vec<Option<f64>>,
    pub steps: Array1<f64>,
}

impl Covariance {
    pub fn standard_error(&self, index: usize) -> Option<f64> {
        self.standard_errors.get(index).copied().flatten()
    }

    /// Rows and columns `indices` of the covariance matrix, in that order.
    ///
    /// # Errors
    /// - [`InferenceError::IndexOutOfRange`] for an index past the end.
    pub fn submatrix(&self, indices: &[usize]) -> InferenceResult<Array2<f64>> {
        let n = self.matrix.nrows();
        if let Some(&index) = indices.iter().find(|&&i| i >= n) {
            return Err(InferenceError::IndexOutOfRange { index, len: n });
        }
        Ok(Array2::from_shape_fn((indices.len(), indices.len()), |(a, b)| {
            self.matrix[[indices[a], indices[b]]]
        }))
    }
}

/// calc_covariance — invert the stencil Hessian of `f` at `x_hat`.
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Scalar cost; failures should be reported as `+∞`.
/// - `x_hat`: `&Array1<f64>`
///   Minimizer of `f`.
/// - `rule`: `&StepRule`
///   Step-size rule.
///
/// Returns
/// -------
/// `InferenceResult<Covariance>`
///
/// Errors
/// ------
/// - [`InferenceError::Hessian`] if a stencil evaluation was not finite.
/// - [`InferenceError::SingularHessian`] if the Hessian cannot be inverted.
/// - [`InferenceError::NonFiniteCovariance`] if the inverse overflowed.
pub fn calc_covariance<F: Fn(&Array1<f64>) -> f64>(
    f: &F, x_hat: &Array1<f64>, rule: &StepRule,
) -> InferenceResult<Covariance> {
    let n = x_hat.len();
    let steps = rule.steps(x_hat);
    let mut hessian = stencil_hessian(f, x_hat, &steps)?;
    symmetrize_hess(&mut hessian);

    let h = DMatrix::from_fn(n, n, |i, j| hessian[[i, j]]);
    let eigenvalues = h.clone().symmetric_eigenvalues();
    let min_abs = eigenvalues.iter().fold(f64::INFINITY, |m, v| m.min(v.abs()));
    let max_abs = eigenvalues.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if n > 0 && min_abs <= EIGEN_EPS * max_abs.max(1.0) {
        return Err(InferenceError::SingularHessian { min_abs_eigenvalue: min_abs });
    }
    let inverse = h
        .try_inverse()
        .ok_or(InferenceError::SingularHessian { min_abs_eigenvalue: min_abs })?;

    let mut matrix = Array2::from_shape_fn((n, n), |(i, j)| inverse[(i, j)]);
    if let Some(((row, col), &value)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(InferenceError::NonFiniteCovariance { row, col, value });
    }
    symmetrize_hess(&mut matrix);

    let standard_errors = (0..n)
        .map(|i| {
            let var = matrix[[i, i]];
            if var > 0.0 {
                Some(var.sqrt())
            } else {
                warn!("parameter {i} has non-positive variance {var:e}; no standard error");
                None
            }
        })
        .collect();

    Ok(Covariance { hessian, matrix, standard_errors, steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Recovery of A⁻¹ from the quadratic cost ½ xᵀ A x.
    // - The step floor for zero-valued coordinates.
    // - Singular, non-finite and indefinite Hessians.
    //
    // They intentionally DO NOT cover:
    // - The household likelihood itself (see the integration test).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The covariance of a quadratic cost is the inverse of its Hessian and
    // standard errors are the root diagonal.
    //
    // Given
    // -----
    // - f(x) = ½ xᵀ A x with A = [[4, 1], [1, 2]], expanded at a point with
    //   one zero coordinate.
    //
    // Expect
    // ------
    // - Hessian ≈ A, covariance ≈ A⁻¹ = [[2, -1], [-1, 4]] / 7.
    // - steps = [0.01·|1.5|, 1e-4].
    fn calc_covariance_inverts_quadratic_hessian() {
        // Arrange
        let a = array![[4.0, 1.0], [1.0, 2.0]];
        let f = |x: &Array1<f64>| 0.5 * x.dot(&a.dot(x));
        let x_hat = array![1.5, 0.0];

        // Act
        let cov = calc_covariance(&f, &x_hat, &StepRule::default()).expect("invertible");

        // Assert
        assert_relative_eq!(cov.steps[0], 0.015, epsilon = 1e-15);
        assert_eq!(cov.steps[1], 1e-4);
        for ((i, j), &v) in cov.hessian.indexed_iter() {
            assert_relative_eq!(v, a[[i, j]], epsilon = 1e-5);
        }
        let expected = array![[2.0, -1.0], [-1.0, 4.0]] / 7.0;
        for ((i, j), &v) in cov.matrix.indexed_iter() {
            assert_relative_eq!(v, expected[[i, j]], epsilon = 1e-5);
        }
        assert_relative_eq!(cov.standard_error(0).expect("se"), (2.0f64 / 7.0).sqrt(), epsilon = 1e-5);
        assert_eq!(cov.submatrix(&[1]).expect("in range")[[0, 0]], cov.matrix[[1, 1]]);
        assert!(matches!(cov.submatrix(&[2]), Err(InferenceError::IndexOutOfRange { .. })));
    }

    #[test]
    // Purpose
    // -------
    // A flat direction makes the Hessian singular; an infinite cost at a
    // stencil point is surfaced as a Hessian error.
    fn calc_covariance_failure_paths() {
        let flat = |x: &Array1<f64>| x[0] * x[0];
        assert!(matches!(
            calc_covariance(&flat, &array![0.3, 0.7], &StepRule::default()),
            Err(InferenceError::SingularHessian { .. })
        ));

        let walled = |x: &Array1<f64>| if x[0] > 1.0 { f64::INFINITY } else { x[0] * x[0] };
        assert!(matches!(
            calc_covariance(&walled, &array![1.0], &StepRule::default()),
            Err(InferenceError::Hessian { source: OptError::InvalidHessian { .. } })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A saddle point inverts, but the negative variance gets no standard
    // error.
    fn negative_variance_has_no_standard_error() {
        let saddle = |x: &Array1<f64>| x[0] * x[0] - x[1] * x[1];
        let cov = calc_covariance(&saddle, &array![0.0, 0.0], &StepRule::default())
            .expect("invertible");
        assert!(cov.standard_error(0).is_some());
        assert!(cov.standard_error(1).is_none());
        assert!(matches!(StepRule::new(0.0, 1e-4), Err(InferenceError::InvalidStepRule { .. })));
    }
}
