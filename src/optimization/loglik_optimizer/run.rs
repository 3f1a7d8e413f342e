//! Execution helpers that run an `argmin` solver on a log-likelihood problem and
//! return a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta,
        adapter::{ArgMinAdapter, SimplexAdapter},
        types::NelderMeadSimplex,
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, IterState, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an L-BFGS optimization for a log-likelihood problem.
///
/// Wires up the model via [`ArgMinAdapter`], the solver, the initial
/// parameter `theta0`, optional observers (behind `obs_slog`) and
/// `max_iters`, then executes and converts the final state into an
/// [`OptimOutcome`].
///
/// # Feature flags
/// With `obs_slog` and `opts.verbose`, a terminal slog observer is attached
/// and ℓ(θ₀) plus ||grad|| are printed once before the first iteration.
///
/// # Errors
/// - Propagates any `argmin` runtime error (cost failures, line-search
///   failures, etc.) via `From<argmin::core::Error>`.
/// - Propagates validation errors from [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>>
        + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

/// Run a Nelder–Mead optimization for a log-likelihood problem.
///
/// The simplex already encodes the start point, so only `max_iters` and
/// the optional observer are configured here. Failed evaluations are `+∞`
/// costs (see [`SimplexAdapter`]); if every vertex stays at `+∞` the final
/// value fails validation and the run is reported as an error.
///
/// # Errors
/// - Propagates `argmin` runtime errors and [`OptimOutcome::new`]
///   validation errors.
pub fn run_nelder_mead<'a, F>(
    opts: &MLEOptions, problem: SimplexAdapter<'a, F>, solver: NelderMeadSimplex,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
{
    let mut optimizer = Executor::new(problem, solver);
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        None,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());

    eprintln!(
        "init: ell(theta0) = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
