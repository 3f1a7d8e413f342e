//! loglik_optimizer::builders — solver construction helpers.
//!
//! Purpose
//! -------
//! Provide small builders for the solvers used by the log-likelihood
//! optimizer. These hide Argmin’s generic wiring and apply crate-level
//! options (tolerances, memory size, simplex geometry) so higher-level code
//! can request a configured solver without touching Argmin-specific types.
//!
//! Key behaviors
//! -------------
//! - Construct L-BFGS solvers with Hager–Zhang, More–Thuente or Armijo
//!   backtracking line search.
//! - Construct a Nelder–Mead solver whose initial simplex is the start
//!   point plus one vertex per coordinate, displaced by
//!   `opts.simplex_step`.
//! - Apply optional gradient and cost-change tolerances from
//!   [`MLEOptions`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All solvers operate on [`Theta`], [`Grad`], and [`Cost`].
//! - Invalid tolerances rejected by Argmin surface as [`OptError`] through
//!   the crate’s `From<Error>` implementation.
//!
//! Conventions
//! -----------
//! - L-BFGS builders do **not** set `theta0` or `max_iters`; the runner
//!   applies those. Nelder–Mead needs its start point here because the
//!   simplex is part of the solver.
//!
//! Testing notes
//! -------------
//! - Unit tests check that valid options build every solver and that the
//!   simplex has `n + 1` vertices.
use argmin::solver::{linesearch::condition::ArmijoCondition, quasinewton::LBFGS};

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            ARMIJO_C, BACKTRACKING_RHO, BacktrackingLS, Cost, DEFAULT_LBFGS_MEM, Grad,
            HagerZhangLS, LbfgsBacktracking, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS,
            NelderMeadSimplex, Theta,
        },
    },
};

/// build_optimizer_hager_zhang — construct L-BFGS with Hager–Zhang line search.
///
/// Parameters
/// ----------
/// - `opts`: `&MLEOptions`
///   Consults `lbfgs_mem` (default [`DEFAULT_LBFGS_MEM`]) and the
///   gradient / cost tolerances.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when Argmin rejects a
///   tolerance.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// build_optimizer_more_thuente — construct L-BFGS with More–Thuente line search.
///
/// Same contract as [`build_optimizer_hager_zhang`] with the
/// [`MoreThuenteLS`] line search.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// build_optimizer_backtracking — construct L-BFGS with Armijo backtracking.
///
/// Same contract as [`build_optimizer_hager_zhang`]. The line search
/// halves the step until the Armijo condition holds, so trial points with
/// an infinite cost are rejected rather than aborting the run.
pub fn build_optimizer_backtracking(opts: &MLEOptions) -> OptResult<LbfgsBacktracking> {
    let armijo = ArmijoCondition::new(ARMIJO_C)?;
    let backtracking = BacktrackingLS::new(armijo).rho(BACKTRACKING_RHO)?;
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsBacktracking::new(backtracking, mem);
    configure_lbfgs(lbfgs, opts)
}

/// configure_lbfgs — apply optional tolerances to an L-BFGS solver.
///
/// When a tolerance is `None`, Argmin’s default remains in effect.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// build_nelder_mead — construct a Nelder–Mead solver around `theta0`.
///
/// Purpose
/// -------
/// Build the axis-aligned initial simplex
/// `{θ₀} ∪ {θ₀ + step·e_i : i = 0..n}` and apply `opts.tols.tol_cost` as
/// the simplex standard-deviation tolerance.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when Argmin rejects the
///   tolerance.
pub fn build_nelder_mead(theta0: &Theta, opts: &MLEOptions) -> OptResult<NelderMeadSimplex> {
    let simplex = initial_simplex(theta0, opts.simplex_step);
    let mut solver = NelderMeadSimplex::new(simplex);
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_sd_tolerance(c)?;
    }
    Ok(solver)
}

fn initial_simplex(theta0: &Theta, step: f64) -> Vec<Theta> {
    let mut vertices = Vec::with_capacity(theta0.len() + 1);
    vertices.push(theta0.clone());
    for i in 0..theta0.len() {
        let mut v = theta0.clone();
        v[i] += step;
        vertices.push(v);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Solver, Tolerances};
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Every L-BFGS builder succeeds with default and explicit memory.
    //
    // Given
    // -----
    // - Valid tolerances, `lbfgs_mem` of `None` and `Some(11)`.
    //
    // Expect
    // ------
    // - Every builder returns `Ok(_)`.
    fn lbfgs_builders_accept_valid_options() {
        // Arrange
        let tols =
            Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).expect("Tolerances should be valid");
        for mem in [None, Some(11)] {
            let opts = MLEOptions::new(tols, Solver::Lbfgs, LineSearcher::HagerZhang, mem)
                .expect("MLEOptions should be valid");

            // Act / Assert
            assert!(build_optimizer_hager_zhang(&opts).is_ok());
            assert!(build_optimizer_more_thuente(&opts).is_ok());
            assert!(build_optimizer_backtracking(&opts).is_ok());
        }
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` leaves Argmin defaults when tolerances are absent.
    fn configure_lbfgs_respects_absent_tolerances() {
        // Arrange
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("Tolerances should be valid");
        let opts = MLEOptions::new(tols, Solver::Lbfgs, LineSearcher::MoreThuente, None)
            .expect("MLEOptions should be valid");

        // Act
        let configured = configure_lbfgs(raw, &opts);

        // Assert
        assert!(configured.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The initial simplex has `n + 1` vertices displaced along each axis.
    fn nelder_mead_simplex_is_axis_aligned() {
        // Arrange
        let theta0 = array![1.0, -2.0, 0.5];

        // Act
        let simplex = initial_simplex(&theta0, 0.25);
        let opts = MLEOptions::default();

        // Assert
        assert_eq!(simplex.len(), 4);
        assert_eq!(simplex[0], theta0);
        assert_eq!(simplex[2], array![1.0, -1.75, 0.5]);
        assert!(build_nelder_mead(&theta0, &opts).is_ok());
    }
}
