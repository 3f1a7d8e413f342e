//! High-level entry point for maximizing a `LogLikelihood`.
//!
//! Selects L-BFGS (Hager–Zhang, More–Thuente or backtracking line search)
//! or Nelder–Mead from [`MLEOptions`], wraps the model in the matching
//! adapter (which *minimizes* `-ℓ(θ)`), and delegates the run to
//! [`run`](super::run).
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::{ArgMinAdapter, SimplexAdapter},
        builders::{
            build_nelder_mead, build_optimizer_backtracking, build_optimizer_hager_zhang,
            build_optimizer_more_thuente,
        },
        run::{run_lbfgs, run_nelder_mead},
        traits::{LineSearcher, LogLikelihood, MLEOptions, Solver},
    },
};

/// Maximize a log-likelihood `ℓ(θ)` with the solver chosen in `opts`.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - `Solver::Lbfgs`: builds L-BFGS with the configured line search and
///   finite-difference gradients (unless the model supplies `grad`).
///   Points where the model fails numerically cost `+∞`. If a More–Thuente
///   or Hager–Zhang run stops because its line search hit such a point, the
///   run is repeated from `theta0` with Armijo backtracking.
/// - `Solver::NelderMead`: builds a simplex around `theta0`.
///
/// # Errors
/// - Propagates any error from `f.check`, the builders, or the runners
///   (e.g., shape or model configuration faults).
///
/// # Returns
/// An [`OptimOutcome`] with `theta_hat`, best value `ℓ(θ̂)`, termination
/// status, iteration and evaluation counts.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use household_transmission::optimization::errors::OptResult;
/// use household_transmission::optimization::loglik_optimizer::{
///     maximize, LogLikelihood, MLEOptions, Theta,
/// };
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.1, -0.2, 0.3], &(), &MLEOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), household_transmission::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    match opts.solver {
        Solver::Lbfgs => {
            let problem = ArgMinAdapter::new(f, data);
            let first = match opts.line_searcher {
                LineSearcher::MoreThuente => {
                    let solver = build_optimizer_more_thuente(opts)?;
                    run_lbfgs(theta0.clone(), opts, problem, solver)
                }
                LineSearcher::HagerZhang => {
                    let solver = build_optimizer_hager_zhang(opts)?;
                    run_lbfgs(theta0.clone(), opts, problem, solver)
                }
                LineSearcher::Backtracking => {
                    let solver = build_optimizer_backtracking(opts)?;
                    return run_lbfgs(theta0, opts, problem, solver);
                }
            };
            let failed_line_search = match &first {
                Ok(outcome) => outcome.line_search_failed,
                Err(e) => e.is_point_failure(),
            };
            if !failed_line_search {
                return first;
            }
            log::warn!(
                "{:?} line search stopped at an unusable point; retrying with backtracking",
                opts.line_searcher
            );
            let solver = build_optimizer_backtracking(opts)?;
            run_lbfgs(theta0, opts, ArgMinAdapter::new(f, data), solver)
        }
        Solver::NelderMead => {
            let problem = SimplexAdapter::new(f, data);
            let solver = build_nelder_mead(&theta0, opts)?;
            run_nelder_mead(opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::traits::Tolerances,
    };
    use ndarray::array;

    /// ℓ(θ) = -Σ (θ_i - c_i)²
    struct Shifted {
        centre: Theta,
    }

    impl LogLikelihood for Shifted {
        type Data = ();

        fn value(&self, theta: &Theta, _data: &()) -> OptResult<f64> {
            Ok(-(theta - &self.centre).mapv(|d| d * d).sum())
        }

        fn check(&self, theta: &Theta, _data: &()) -> OptResult<()> {
            if theta.len() != self.centre.len() {
                return Err(OptError::ThetaLengthMismatch {
                    expected: self.centre.len(),
                    actual: theta.len(),
                });
            }
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // Every solver configuration finds the maximizer of a concave quadratic.
    //
    // Given
    // -----
    // - ℓ(θ) = -||θ - (1, -2)||², start (0, 0).
    //
    // Expect
    // ------
    // - θ̂ ≈ (1, -2) and the run reports convergence.
    fn maximize_recovers_quadratic_optimum_with_each_solver() {
        // Arrange
        let model = Shifted { centre: array![1.0, -2.0] };
        let tols = Tolerances::new(Some(1e-8), Some(1e-12), Some(2000)).expect("valid");
        let configs = [
            (Solver::Lbfgs, LineSearcher::MoreThuente),
            (Solver::Lbfgs, LineSearcher::HagerZhang),
            (Solver::Lbfgs, LineSearcher::Backtracking),
            (Solver::NelderMead, LineSearcher::MoreThuente),
        ];

        for (solver, ls) in configs {
            let opts = MLEOptions::new(tols, solver, ls, None).expect("valid options");

            // Act
            let out = maximize(&model, array![0.0, 0.0], &(), &opts).expect("run succeeds");

            // Assert
            assert!(out.converged, "{solver:?}/{ls:?} status {}", out.status);
            assert!((out.theta_hat[0] - 1.0).abs() < 1e-3, "{solver:?}: {:?}", out.theta_hat);
            assert!((out.theta_hat[1] + 2.0).abs() < 1e-3, "{solver:?}: {:?}", out.theta_hat);
            assert!(out.value <= 0.0 && out.value > -1e-5);
        }
    }

    /// ℓ(θ) = -(θ₀ - 3)² - (θ₁ + 1)², undefined for θ₀ > 4.
    struct Cliff;

    impl LogLikelihood for Cliff {
        type Data = ();

        fn value(&self, theta: &Theta, _data: &()) -> OptResult<f64> {
            if theta[0] > 4.0 {
                return Err(OptError::NumericalFailure {
                    text: format!("no value at θ₀ = {}", theta[0]),
                });
            }
            Ok(-(theta[0] - 3.0).powi(2) - (theta[1] + 1.0).powi(2))
        }

        fn check(&self, theta: &Theta, _data: &()) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::ThetaLengthMismatch { expected: 2, actual: theta.len() });
            }
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // An L-BFGS run whose first step lands where the model fails still
    // reaches the optimum.
    //
    // Given
    // -----
    // - `Cliff` from (0, 0): the steepest-descent step of length one lands
    //   on (6, -2), inside the failing region; half of it is the optimum.
    //
    // Expect
    // ------
    // - Every line search setting converges to (3, -1) without an error.
    fn lbfgs_steps_back_from_failing_region() {
        // Arrange
        let tols = Tolerances::new(Some(1e-8), Some(1e-12), Some(500)).expect("valid");

        for ls in [LineSearcher::MoreThuente, LineSearcher::HagerZhang, LineSearcher::Backtracking] {
            let opts = MLEOptions::new(tols, Solver::Lbfgs, ls, None).expect("valid options");

            // Act
            let out = maximize(&Cliff, array![0.0, 0.0], &(), &opts).expect("run succeeds");

            // Assert
            assert!(out.converged, "{ls:?} status {}", out.status);
            assert!(!out.line_search_failed);
            assert!((out.theta_hat[0] - 3.0).abs() < 1e-3, "{ls:?}: {:?}", out.theta_hat);
            assert!((out.theta_hat[1] + 1.0).abs() < 1e-3, "{ls:?}: {:?}", out.theta_hat);
        }
    }

    #[test]
    // Purpose
    // -------
    // `check` runs before any solver work.
    fn maximize_rejects_start_failing_check() {
        let model = Shifted { centre: array![1.0, -2.0] };
        let err = maximize(&model, array![0.0], &(), &MLEOptions::default())
            .expect_err("length mismatch");
        assert!(matches!(err, OptError::ThetaLengthMismatch { expected: 2, actual: 1 }));
    }
}
