//! loglik_optimizer::finite_diff — finite-difference gradient and Hessian helpers.
//!
//! Purpose
//! -------
//! Provide the finite-difference derivatives the rest of the crate needs
//! without depending directly on the `finitediff` API: a forward-difference
//! gradient fallback for the optimizer adapter, and an explicit
//! fourth-order stencil Hessian of a scalar objective for the inference
//! layer.
//!
//! Key behaviors
//! -------------
//! - Compute forward-difference gradients with error capture and
//!   post-hoc validation via [`run_fd_diff`].
//! - Approximate the Hessian of a scalar objective with per-coordinate
//!   step sizes via [`stencil_hessian`]: a 4-point central cross
//!   difference off the diagonal and a 5-point stencil on it.
//! - Enforce symmetry of Hessian matrices in-place using
//!   [`symmetrize_hess`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Any error raised by the objective during finite differencing is
//!   routed into the shared `closure_err` cell and treated as a hard
//!   failure for the gradient computation.
//! - [`stencil_hessian`] accepts objectives that encode failure as a
//!   non-finite value; such values surface as
//!   [`OptError::InvalidHessian`] rather than being silently used.
//!
//! Conventions
//! -----------
//! - The stencil works in whatever space the objective is defined on; the
//!   inference layer calls it in model space at the fitted estimate.
//! - The stencil evaluates `1 + 2n + 4·n(n-1)/2 + 2n` objective values for
//!   `n` parameters; the centre value is evaluated once.
//!
//! Testing notes
//! -------------
//! - Unit tests cover gradient error capture, recovery of an analytic
//!   quadratic Hessian, non-finite detection and symmetrization.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use ndarray::Array1;
use std::cell::RefCell;

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Purpose
/// -------
/// Compute a forward-difference approximation to the gradient of a scalar
/// objective at `theta`, while capturing any error raised inside the
/// evaluation closure and enforcing shape/finiteness on the result.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the gradient is approximated.
/// - `func`: `&G`
///   Objective closure. It is expected to write evaluation errors into
///   `closure_err` and return `NaN` in that case.
/// - `closure_err`: `&RefCell<Option<Error>>`
///   Shared error slot; cleared on entry and inspected after the FD call.
///
/// Returns
/// -------
/// `OptResult<Grad>`
///   - `Ok(grad)` when no error was captured and [`validate_grad`] passes.
///
/// Errors
/// ------
/// - `OptError` (via `From<Error>`) for an error captured from `func`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    let dim = theta.len();
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

/// stencil_hessian — fourth-order finite-difference Hessian of a scalar objective.
///
/// Purpose
/// -------
/// Approximate `∂²f/∂x_j∂x_k` at `x` using coordinate steps `h`:
///
/// - off-diagonal:
///   `[f(+j+k) - f(+j-k) - f(-j+k) + f(-j-k)] / (4 h_j h_k)`
/// - diagonal:
///   `[-f(+2j) + 16 f(+j) - 30 f(x) + 16 f(-j) - f(-2j)] / (12 h_j²)`
///
/// The upper triangle is computed and mirrored into the lower one.
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Scalar objective. Failures should be reported as non-finite values.
/// - `x`: `&Theta`
///   Expansion point.
/// - `h`: `&Array1<f64>`
///   Per-coordinate step sizes, same length as `x`, all finite and `> 0`.
///
/// Returns
/// -------
/// `OptResult<Hessian>`
///   A validated `n × n` matrix with finite entries.
///
/// Errors
/// ------
/// - `OptError::StartDimMismatch` if `h.len() != x.len()`.
/// - `OptError::InvalidHessian` for the first non-finite entry (for
///   example when the objective returned `+∞` at a stencil point).
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use household_transmission::optimization::loglik_optimizer::finite_diff::stencil_hessian;
/// let f = |x: &ndarray::Array1<f64>| x[0] * x[0] + 3.0 * x[0] * x[1];
/// let h = stencil_hessian(&f, &array![1.0, 2.0], &array![1e-3, 1e-3]).unwrap();
/// assert!((h[[0, 1]] - 3.0).abs() < 1e-6);
/// ```
pub fn stencil_hessian<F: Fn(&Theta) -> f64>(
    f: &F, x: &Theta, h: &Array1<f64>,
) -> OptResult<Hessian> {
    let n = x.len();
    if h.len() != n {
        return Err(OptError::StartDimMismatch { expected: n, found: h.len() });
    }
    let eval_at = |shifts: &[(usize, f64)]| -> f64 {
        let mut point = x.clone();
        for &(idx, delta) in shifts {
            point[idx] += delta;
        }
        f(&point)
    };

    let f0 = f(x);
    let mut hess = Hessian::zeros((n, n));
    for j in 0..n {
        let hj = h[j];
        let diag = -eval_at(&[(j, 2.0 * hj)]) + 16.0 * eval_at(&[(j, hj)]) - 30.0 * f0
            + 16.0 * eval_at(&[(j, -hj)])
            - eval_at(&[(j, -2.0 * hj)]);
        hess[[j, j]] = diag / (12.0 * hj * hj);

        for k in (j + 1)..n {
            let hk = h[k];
            let cross = eval_at(&[(j, hj), (k, hk)])
                - eval_at(&[(j, hj), (k, -hk)])
                - eval_at(&[(j, -hj), (k, hk)])
                + eval_at(&[(j, -hj), (k, -hk)]);
            let value = cross / (4.0 * hj * hk);
            hess[[j, k]] = value;
            hess[[k, j]] = value;
        }
    }
    validate_hessian(&hess, n)?;
    Ok(hess)
}

/// symmetrize_hess — replace `H` by `(H + Hᵀ) / 2` in place.
///
/// Off-diagonal pairs are averaged; the diagonal is unchanged. Assumes a
/// square matrix.
pub fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::ArgminError;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Forward-difference gradient computation with and without closure errors.
    // - Recovery of an analytic Hessian by the stencil, including shrinking steps.
    // - Non-finite objective values surfacing as InvalidHessian.
    // - In-place symmetrization.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `run_fd_diff` returns a finite gradient close to the analytic one for a
    // quadratic objective.
    fn run_fd_diff_quadratic_returns_valid_gradient() {
        // Arrange
        let theta: Theta = array![0.5, -1.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |x: &Theta| x.dot(x);

        // Act
        let grad = run_fd_diff(&theta, &f, &closure_err).expect("quadratic gradient");

        // Assert
        assert_eq!(grad.len(), 2);
        assert!((grad[0] - 1.0).abs() < 1e-5);
        assert!((grad[1] + 2.0).abs() < 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // An error captured inside the closure is surfaced as an `OptError`.
    fn run_fd_diff_closure_error_is_propagated() {
        // Arrange
        let theta: Theta = array![1.0];
        let closure_err: RefCell<Option<Error>> = RefCell::new(None);
        let f = |_: &Theta| {
            let argmin_err = ArgminError::NotImplemented { text: "fd test".to_string() };
            closure_err.replace(Some(argmin_err.into()));
            f64::NAN
        };

        // Act
        let err = run_fd_diff(&theta, &f, &closure_err).expect_err("closure error must surface");

        // Assert
        assert!(matches!(err, OptError::Solver { kind: "not implemented", .. }), "got {err:?}");
    }

    #[test]
    // Purpose
    // -------
    // The stencil recovers the analytic Hessian of a quadratic, and the
    // error shrinks with the step for a non-quadratic objective.
    //
    // Given
    // -----
    // - q(x) = ½ xᵀ A x + bᵀx with A = [[4, 1, 0], [1, 3, -2], [0, -2, 5]].
    // - g(x) = exp(x0) · sin(x1) at (0.3, 0.7).
    //
    // Expect
    // ------
    // - Entries of the quadratic's stencil Hessian match A to 1e-6.
    // - For g, the max error at h = 1e-3 is below the error at h = 1e-1.
    fn stencil_hessian_recovers_analytic_hessian() {
        // Arrange
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, -2.0], [0.0, -2.0, 5.0]];
        let b = array![0.5, -1.0, 2.0];
        let quad = |x: &Theta| 0.5 * x.dot(&a.dot(x)) + b.dot(x);
        let x = array![0.2, -0.4, 1.3];

        // Act
        let h = stencil_hessian(&quad, &x, &array![1e-2, 1e-2, 1e-2]).expect("quadratic");

        // Assert
        for ((i, j), &v) in h.indexed_iter() {
            assert!((v - a[[i, j]]).abs() < 1e-6, "entry ({i},{j}) = {v}");
        }

        // Arrange
        let g = |x: &Theta| x[0].exp() * x[1].sin();
        let p: Theta = array![0.3, 0.7];
        let (e0, s1) = (p[0].exp(), p[1].sin());
        let c1 = p[1].cos();
        let exact = array![[e0 * s1, e0 * c1], [e0 * c1, -e0 * s1]];
        let max_err = |step: f64| -> f64 {
            let approx = stencil_hessian(&g, &p, &array![step, step]).expect("smooth");
            (&approx - &exact).iter().fold(0.0_f64, |m, v| m.max(v.abs()))
        };

        // Act / Assert
        assert!(max_err(1e-3) < max_err(1e-1));
        assert!(max_err(1e-3) < 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // A non-finite objective value at any stencil point yields
    // `InvalidHessian` instead of a silently corrupted matrix.
    fn stencil_hessian_rejects_non_finite_objective() {
        // Arrange
        let f = |x: &Theta| if x[0] > 1.005 { f64::INFINITY } else { x[0] * x[0] };

        // Act
        let err = stencil_hessian(&f, &array![1.0], &array![0.01]).expect_err("must fail");

        // Assert
        assert!(matches!(err, OptError::InvalidHessian { .. }), "got {err:?}");
        assert!(matches!(
            stencil_hessian(&f, &array![1.0, 2.0], &array![0.1]),
            Err(OptError::StartDimMismatch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `symmetrize_hess` averages each off-diagonal pair and keeps the diagonal.
    fn symmetrize_hess_makes_matrix_symmetric() {
        // Arrange
        let mut h: Hessian = Array2::from_shape_vec((2, 2), vec![1.0_f64, 2.0, 0.0, 3.0])
            .expect("2x2 shape");

        // Act
        symmetrize_hess(&mut h);

        // Assert
        assert_eq!(h[[0, 0]], 1.0);
        assert_eq!(h[[1, 1]], 3.0);
        assert_eq!(h[[0, 1]], 1.0);
        assert_eq!(h[[1, 0]], 1.0);
    }
}
