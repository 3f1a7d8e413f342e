//! Errors for the household transmission likelihood.
//!
//! ## Conventions
//! - Household indices are **0-based** positions in
//!   [`HouseholdData::households`](crate::household::HouseholdData).
//! - Numerical failures inside one household's Ball-matrix solve are
//!   reported as [`ModelError::NumericalFailure`]; the scalar objective
//!   turns them into `+∞` instead of propagating.

/// Result alias for likelihood operations that may produce [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Parameter vector ----
    /// Parameter vector length does not match the layout.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// A parameter entry is NaN/±inf.
    InvalidThetaInput { index: usize, value: f64 },

    /// Ridge weight must be finite and non-negative.
    InvalidRidge { value: f64 },

    // ---- Data ----
    /// The dataset has no households.
    EmptyData,

    /// A household's design matrix does not have one column per age band.
    DesignWidthMismatch { household: usize, expected: usize, found: usize },

    /// A household has more cases than the configured cap allows.
    TooManyCases { household: usize, cases: usize, cap: usize },

    // ---- Evaluation ----
    /// The Ball-matrix solve for one household broke down.
    NumericalFailure { household: usize, reason: String },
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Parameter vector ----
            ModelError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Parameter vector has length {actual}, expected {expected}")
            }
            ModelError::InvalidThetaInput { index, value } => {
                write!(f, "Parameter {index} is not finite: {value}")
            }
            ModelError::InvalidRidge { value } => {
                write!(f, "Ridge weight must be finite and non-negative, got {value}")
            }

            // ---- Data ----
            ModelError::EmptyData => write!(f, "Dataset contains no households"),
            ModelError::DesignWidthMismatch { household, expected, found } => write!(
                f,
                "Household {household}: design has {found} columns, expected {expected}"
            ),
            ModelError::TooManyCases { household, cases, cap } => write!(
                f,
                "Household {household} has {cases} cases, more than the cap of {cap}"
            ),

            // ---- Evaluation ----
            ModelError::NumericalFailure { household, reason } => {
                write!(f, "Household {household}: numerical failure: {reason}")
            }
        }
    }
}
