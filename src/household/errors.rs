//! Errors for household dataset construction and I/O.
//!
//! ## Conventions
//! - Record indices are **0-based** positions in the input table (the CSV
//!   header is not counted).
//! - Data-integrity failures are fatal; nothing is silently dropped.
//! - I/O and codec errors from `csv`, `serde_json` and `std::io` are
//!   normalized to text-carrying variants so the enum stays `Clone`.

/// Result alias for dataset operations that may produce [`DataError`].
pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    // ---- Record integrity ----
    /// No person records were supplied.
    EmptyDataset,

    /// A record has no (or an empty) household identifier.
    MissingHouseholdId { index: usize },

    /// A record has no outcome value.
    MissingOutcome { index: usize },

    /// Outcomes must be 0 or 1.
    InvalidOutcome { index: usize, value: u8 },

    // ---- Age bands ----
    /// A band has `min > max` or an empty label.
    InvalidAgeBand { label: String, min: u32, max: u32 },

    /// Two bands share at least one age.
    OverlappingAgeBands { first: String, second: String },

    // ---- Households ----
    /// A deserialized household violates the outcome/design shape invariant.
    InconsistentHousehold { id: String, reason: String },

    // ---- Synthetic cohort ----
    /// Generator settings cannot produce a dataset.
    InvalidCohort { reason: String },

    // ---- I/O ----
    Csv { text: String },
    Json { text: String },
    Io { text: String },
}

impl std::error::Error for DataError {}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Record integrity ----
            DataError::EmptyDataset => write!(f, "Dataset contains no person records"),
            DataError::MissingHouseholdId { index } => {
                write!(f, "Record {index}: missing household identifier")
            }
            DataError::MissingOutcome { index } => {
                write!(f, "Record {index}: missing outcome value")
            }
            DataError::InvalidOutcome { index, value } => {
                write!(f, "Record {index}: outcome must be 0 or 1, found {value}")
            }

            // ---- Age bands ----
            DataError::InvalidAgeBand { label, min, max } => {
                write!(f, "Invalid age band '{label}' [{min}, {max}]: need a label and min <= max")
            }
            DataError::OverlappingAgeBands { first, second } => {
                write!(f, "Age bands '{first}' and '{second}' overlap")
            }

            // ---- Households ----
            DataError::InconsistentHousehold { id, reason } => {
                write!(f, "Household '{id}' is inconsistent: {reason}")
            }

            // ---- Synthetic cohort ----
            DataError::InvalidCohort { reason } => {
                write!(f, "Invalid synthetic cohort settings: {reason}")
            }

            // ---- I/O ----
            DataError::Csv { text } => write!(f, "CSV error: {text}"),
            DataError::Json { text } => write!(f, "JSON error: {text}"),
            DataError::Io { text } => write!(f, "I/O error: {text}"),
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv { text: err.to_string() }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Json { text: err.to_string() }
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io { text: err.to_string() }
    }
}
