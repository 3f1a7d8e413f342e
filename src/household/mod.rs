//! household — person records, age coding, and per-household datasets.
//!
//! Purpose
//! -------
//! Turn a flat table of `(household id, age, outcome)` records into the
//! per-household outcome vectors and design matrices consumed by the
//! likelihood, and move those tables and datasets in and out of files.
//!
//! Key behaviors
//! -------------
//! - [`records`]: CSV ingestion/egress of [`PersonRecord`]s and the seeded
//!   [`SyntheticCohort`] generator.
//! - [`age`]: [`AgeBands`] mapping raw ages to one-hot design rows with an
//!   all-zero reference class.
//! - [`data`]: [`HouseholdData::from_records`] grouping, integrity checks,
//!   and the JSON artifact.
//! - [`errors`]: [`DataError`] / [`DataResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Data-integrity failures (missing id, missing or non-binary outcome)
//!   are fatal; records are never silently dropped.
//! - Grouping is deterministic: first-appearance household order, input
//!   member order.
//!
//! Downstream usage
//! ----------------
//! - The model layer prepares a [`HouseholdData`] once per fit and reads it
//!   immutably thereafter.
//! - The `hhfit` binary uses [`records`] for `generate` and [`data`] for
//!   `prepare`.

pub mod age;
pub mod data;
pub mod errors;
pub mod records;

pub use self::age::{AgeBand, AgeBands};
pub use self::data::{DatasetSummary, Household, HouseholdData};
pub use self::errors::{DataError, DataResult};
pub use self::records::{
    PersonRecord, SyntheticCohort, read_records, read_records_csv, write_records_csv,
};

pub mod prelude {
    pub use super::age::{AgeBand, AgeBands};
    pub use super::data::{Household, HouseholdData};
    pub use super::errors::{DataError, DataResult};
    pub use super::records::{PersonRecord, SyntheticCohort};
}
