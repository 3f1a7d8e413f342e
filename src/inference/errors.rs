//! Unified error handling for inference routines.
//!
//! This module defines `InferenceError`, the error type used by the
//! Hessian/covariance step, the multivariate-normal sampler and the derived
//! quantities. It groups step-size and level validation, numerical
//! degeneracies of the information matrix, and a passthrough for optimizer
//! errors raised while differentiating the objective. An alias
//! `InferenceResult<T>` standardizes the return type across inference code.
//!
//! None of these errors abort a fit: the pipeline reports them and keeps the
//! point estimates.
use crate::optimization::errors::OptError;

/// Unified error type for inference routines.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Settings ----
    /// Relative step and step floor must be finite and positive.
    InvalidStepRule {
        relative: f64,
        min_step: f64,
    },

    /// Confidence level must lie strictly between 0 and 1.
    InvalidLevel {
        level: f64,
    },

    /// Monte Carlo draw count must be positive.
    InvalidDrawCount {
        draws: usize,
    },

    // ---- Hessian / covariance ----
    /// Finite-difference Hessian could not be formed.
    Hessian {
        source: OptError,
    },

    /// Hessian is singular or too ill-conditioned to invert.
    SingularHessian {
        min_abs_eigenvalue: f64,
    },

    /// Inverted matrix contains a non-finite entry.
    NonFiniteCovariance {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Sampling ----
    /// Mean and covariance shapes disagree, or the covariance is not square.
    SamplerDimMismatch {
        mean: usize,
        rows: usize,
        cols: usize,
    },

    /// Mean or covariance contains a non-finite entry.
    NonFiniteSamplerInput,

    /// Parameter index outside the fitted vector.
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl From<OptError> for InferenceError {
    fn from(err: OptError) -> Self {
        InferenceError::Hessian { source: err }
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Settings ----
            InferenceError::InvalidStepRule { relative, min_step } => write!(
                f,
                "Inference Error: step rule needs finite positive values (relative = {relative}, min_step = {min_step})"
            ),
            InferenceError::InvalidLevel { level } => {
                write!(f, "Inference Error: confidence level {level} is not in (0, 1)")
            }
            InferenceError::InvalidDrawCount { draws } => {
                write!(f, "Inference Error: Monte Carlo draw count must be positive, got {draws}")
            }

            // ---- Hessian / covariance ----
            InferenceError::Hessian { source } => {
                write!(f, "Inference Error: Hessian evaluation failed: {source}")
            }
            InferenceError::SingularHessian { min_abs_eigenvalue } => write!(
                f,
                "Inference Error: Hessian is singular (smallest |eigenvalue| = {min_abs_eigenvalue:e})"
            ),
            InferenceError::NonFiniteCovariance { row, col, value } => write!(
                f,
                "Inference Error: covariance entry ({row}, {col}) is not finite: {value}"
            ),

            // ---- Sampling ----
            InferenceError::SamplerDimMismatch { mean, rows, cols } => write!(
                f,
                "Inference Error: mean of length {mean} does not match a {rows}x{cols} covariance"
            ),
            InferenceError::NonFiniteSamplerInput => {
                write!(f, "Inference Error: sampler mean or covariance is not finite")
            }
            InferenceError::IndexOutOfRange { index, len } => {
                write!(f, "Inference Error: parameter index {index} out of range for length {len}")
            }
        }
    }
}
