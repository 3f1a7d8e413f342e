use argmin::core::{ArgminError, Error};

use crate::model::errors::ModelError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    /// Invalid solver name.
    InvalidSolver {
        name: String,
        reason: &'static str,
    },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    /// Nelder–Mead simplex step must be positive and finite.
    InvalidSimplexStep {
        step: f64,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    /// The model could not be evaluated at this point, although the point
    /// itself is well formed. Solvers treat it as an infinite cost.
    NumericalFailure {
        text: String,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Box constraints ----
    /// Lower and upper bound vectors differ in length.
    BoundsDimMismatch {
        lower: usize,
        upper: usize,
    },

    /// A bound pair is non-finite or not strictly increasing.
    InvalidBounds {
        index: usize,
        lower: f64,
        upper: f64,
    },

    /// A start point lies outside the box.
    StartOutOfBounds {
        index: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    /// Start point length does not match the bounds.
    StartDimMismatch {
        expected: usize,
        found: usize,
    },

    // ---- Multi-start ----
    /// No random start with a finite objective was found.
    NoFiniteStart {
        draws: usize,
    },

    // ---- Argmin ---
    /// Error raised inside argmin; `kind` names the argmin error class.
    Solver {
        kind: &'static str,
        text: String,
    },

    // ---- Finite Diffs ----
    /// Hessian matrix dimensions do not match parameter dimensions.
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },

    /// Hessian values need to be finite.
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Model errors ----
    /// Parameter vector length does not match the model layout.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Parameter vector entries must be finite.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    /// Any other model-layer failure, rendered as text.
    ModelFailure {
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient optimization not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidSolver { name, reason } => {
                write!(f, "Invalid solver '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::InvalidSimplexStep { step } => {
                write!(f, "Invalid Nelder-Mead simplex step {step}: must be finite and > 0")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }
            OptError::NumericalFailure { text } => {
                write!(f, "Numerical failure: {text}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Box constraints ----
            OptError::BoundsDimMismatch { lower, upper } => {
                write!(f, "Bounds dimension mismatch: {lower} lower vs {upper} upper")
            }
            OptError::InvalidBounds { index, lower, upper } => {
                write!(
                    f,
                    "Invalid bounds at index {index}: [{lower}, {upper}], must be finite with lower < upper"
                )
            }
            OptError::StartOutOfBounds { index, value, lower, upper } => {
                write!(f, "Start value {value} at index {index} outside bounds [{lower}, {upper}]")
            }
            OptError::StartDimMismatch { expected, found } => {
                write!(f, "Start point dimension mismatch: expected {expected}, found {found}")
            }

            // ---- Multi-start ----
            OptError::NoFiniteStart { draws } => {
                write!(f, "No start point with a finite objective after {draws} draws")
            }

            // ---- Argmin ----
            OptError::Solver { kind, text } => {
                write!(f, "Solver error ({kind}): {text}")
            }

            // ---- Finite Diffs ----
            OptError::HessianDimMismatch { expected, found } => {
                write!(
                    f,
                    "Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Invalid Hessian at ({row}, {col}): {value}, must be finite")
            }

            // ---- Model errors ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            OptError::ModelFailure { text } => {
                write!(f, "Model failure: {text}")
            }
        }
    }
}

impl OptError {
    /// Whether the error only says the objective is unusable at one point,
    /// so a solver may step back instead of stopping.
    pub fn is_point_failure(&self) -> bool {
        matches!(self, OptError::NonFiniteCost { .. } | OptError::NumericalFailure { .. })
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Our own errors travel through argmin boxed; recover them first.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        let (kind, text) = match original_err.downcast::<ArgminError>() {
            Ok(ArgminError::InvalidParameter { text }) => ("invalid parameter", text),
            Ok(ArgminError::NotImplemented { text }) => ("not implemented", text),
            Ok(ArgminError::NotInitialized { text }) => ("not initialized", text),
            Ok(ArgminError::ConditionViolated { text }) => ("condition violated", text),
            Ok(ArgminError::CheckpointNotFound { text }) => ("checkpoint not found", text),
            Ok(ArgminError::PotentialBug { text }) => ("potential bug", text),
            Ok(ArgminError::ImpossibleError { text }) => ("impossible error", text),
            Ok(other) => ("argmin", other.to_string()),
            Err(err) => ("backend", err.to_string()),
        };
        OptError::Solver { kind, text }
    }
}

impl From<ModelError> for OptError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ThetaLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            ModelError::InvalidThetaInput { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            err @ ModelError::NumericalFailure { .. } => {
                OptError::NumericalFailure { text: err.to_string() }
            }
            other => OptError::ModelFailure { text: other.to_string() },
        }
    }
}
