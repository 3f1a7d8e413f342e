//! Public API surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait implemented by models.
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`Solver`] and [`LineSearcher`]: choice of algorithm.
//! - [`OptimOutcome`]: normalized result returned by `maximize`.
//!
//! Convention: we *maximize* a log-likelihood `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided, it should be the gradient
//! of the log-likelihood (`∇ℓ(θ)`); the adapter flips the sign as needed.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        types::DEFAULT_SIMPLEX_STEP,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood interface consumed by the optimizer.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
/// If you provide an analytic gradient, return `∇ℓ(θ)`.
///
/// - `type Data`: per-model data carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: reject obviously invalid
///   `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, finite differences are used automatically.
pub trait LogLikelihood {
    type Data: 'static;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// More–Thuente and Hager–Zhang stop on an infinite trial cost; a run that
/// ends that way is repeated with `Backtracking`, which shrinks the step
/// instead.
///
/// Parses case-insensitively from `"MoreThuente"` / `"HagerZhang"` /
/// `"Backtracking"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
    Backtracking,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            "backtracking" => Ok(LineSearcher::Backtracking),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente', 'HagerZhang' or 'Backtracking'.",
            }),
        }
    }
}

/// Optimization algorithm.
///
/// - `Lbfgs`: quasi-Newton with finite-difference gradients. Points where
///   the model cannot be evaluated cost `+∞`; see [`LineSearcher`] for how
///   the line search handles them.
/// - `NelderMead`: derivative-free simplex. Non-finite costs are treated
///   as `+∞` so the simplex simply moves away from them.
///
/// Parses case-insensitively from `"lbfgs"`, `"l-bfgs"`, `"neldermead"`,
/// `"nelder-mead"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    Lbfgs,
    NelderMead,
}

impl FromStr for Solver {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "lbfgs" => Ok(Solver::Lbfgs),
            "neldermead" => Ok(Solver::NelderMead),
            _ => Err(OptError::InvalidSolver {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'lbfgs' or 'nelder-mead'.",
            }),
        }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols`: numerical tolerances and iteration limits.
/// - `solver`: algorithm used for each run.
/// - `line_searcher`: line search used by L-BFGS (ignored by Nelder–Mead).
/// - `verbose`: attaches an observer (behind the `obs_slog` feature).
/// - `lbfgs_mem`: L-BFGS history; `None` uses the default of 7.
/// - `simplex_step`: edge length of the initial Nelder–Mead simplex.
///
/// Default:
/// - `tols`: `tol_grad = 1e-6`, `tol_cost = 1e-9`, `max_iter = 1000`
/// - `solver`: `Lbfgs` with `MoreThuente`
/// - `verbose`: `false`
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub solver: Solver,
    pub line_searcher: LineSearcher,
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
    pub simplex_step: f64,
}

impl MLEOptions {
    /// Create a new set of optimizer options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, solver: Solver, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self {
            tols,
            solver,
            line_searcher,
            verbose: false,
            lbfgs_mem,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        })
    }

    /// Replace the initial simplex edge length.
    ///
    /// # Errors
    /// - [`OptError::InvalidSimplexStep`] unless `step` is finite and `> 0`.
    pub fn with_simplex_step(mut self, step: f64) -> OptResult<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(OptError::InvalidSimplexStep { step });
        }
        self.simplex_step = step;
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-6), tol_cost: Some(1e-9), max_iter: Some(1000) },
            solver: Solver::Lbfgs,
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
            lbfgs_mem: None,
            simplex_step: DEFAULT_SIMPLEX_STEP,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold
///   (L-BFGS only).
/// - `tol_cost`: terminate when the change in cost falls below this
///   threshold; for Nelder–Mead it is the standard deviation of the simplex
///   costs.
/// - `max_iter`: hard cap on the number of iterations.
///
/// At least one of the three must be provided (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** value `ℓ(θ)` (not the cost).
/// - `converged`: `true` only if the solver stopped because it met its
///   convergence criterion or target cost; hitting `max_iter` is not
///   convergence.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if present.
/// - `line_search_failed`: the L-BFGS run stopped because its line search
///   returned an error.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub line_search_failed: bool,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let converged = is_success(&termination);
        let line_search_failed = matches!(
            &termination,
            TerminationStatus::Terminated(TerminationReason::SolverExit(msg))
                if msg.starts_with("Line search terminated")
        );
        let status = match termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations,
            fn_evals,
            grad_norm,
            line_search_failed,
        })
    }
}

/// Whether a termination status counts as a successful run.
pub fn is_success(status: &TerminationStatus) -> bool {
    matches!(
        status,
        TerminationStatus::Terminated(
            TerminationReason::SolverConverged | TerminationReason::TargetCostReached
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Solver and line-search names parse case-insensitively and reject
    // unknown names with the dedicated error variants.
    fn solver_and_line_searcher_parse_from_str() {
        assert_eq!("LBFGS".parse::<Solver>().expect("lbfgs parses"), Solver::Lbfgs);
        assert_eq!("l-bfgs".parse::<Solver>().expect("l-bfgs parses"), Solver::Lbfgs);
        assert_eq!(
            "Nelder-Mead".parse::<Solver>().expect("nelder-mead parses"),
            Solver::NelderMead
        );
        assert!(matches!("tnc".parse::<Solver>(), Err(OptError::InvalidSolver { .. })));

        assert_eq!(
            "hagerzhang".parse::<LineSearcher>().expect("hz parses"),
            LineSearcher::HagerZhang
        );
        assert_eq!(
            "Backtracking".parse::<LineSearcher>().expect("backtracking parses"),
            LineSearcher::Backtracking
        );
        assert!(matches!(
            "armijo".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Tolerance and option constructors reject empty or invalid settings.
    fn tolerances_and_options_validate_inputs() {
        assert!(matches!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided)));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, Some(f64::NAN), None),
            Err(OptError::InvalidTolCost { .. })
        ));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { .. })
        ));

        let tols = Tolerances::new(Some(1e-6), None, Some(10)).expect("valid tolerances");
        assert!(matches!(
            MLEOptions::new(tols, Solver::Lbfgs, LineSearcher::MoreThuente, Some(0)),
            Err(OptError::InvalidLBFGSMem { .. })
        ));
        let opts = MLEOptions::new(tols, Solver::NelderMead, LineSearcher::MoreThuente, None)
            .expect("valid options");
        assert!(matches!(
            opts.clone().with_simplex_step(0.0),
            Err(OptError::InvalidSimplexStep { .. })
        ));
        assert_eq!(opts.with_simplex_step(0.25).expect("valid step").simplex_step, 0.25);
    }

    #[test]
    // Purpose
    // -------
    // Only convergence and target-cost terminations count as success.
    fn success_requires_convergence_not_iteration_cap() {
        assert!(is_success(&TerminationStatus::Terminated(TerminationReason::SolverConverged)));
        assert!(is_success(&TerminationStatus::Terminated(TerminationReason::TargetCostReached)));
        assert!(!is_success(&TerminationStatus::Terminated(TerminationReason::MaxItersReached)));
        assert!(!is_success(&TerminationStatus::NotTerminated));
    }
}
