//! Person-level records: CSV I/O and a seeded synthetic cohort.
//!
//! Purpose
//! -------
//! Bring the flat per-person table into the crate and out again. The table
//! has one row per person with the columns `hh_id,age,case`; empty cells
//! are read as missing values and checked later by the dataset builder.
//!
//! Key behaviors
//! -------------
//! - [`read_records`] / [`read_records_csv`] deserialize rows with `csv` +
//!   `serde`; malformed cells (e.g. a non-numeric age) are CSV errors.
//! - [`write_records_csv`] writes the same layout back.
//! - [`SyntheticCohort`] generates a reproducible test table from an
//!   explicit seed: household ids uniform on `0..households`, ages uniform
//!   on `0..max_age`, and a rare positive outcome.
//!
//! Conventions
//! -----------
//! - Missing values stay `None` here; deciding whether they are fatal is the
//!   builder's job.
use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use rand::{Rng, SeedableRng, distributions::Bernoulli, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::household::errors::{DataError, DataResult};

/// One row of the person table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "hh_id")]
    pub household_id: Option<String>,
    pub age: Option<u32>,
    pub case: Option<u8>,
}

impl PersonRecord {
    pub fn new(household_id: impl Into<String>, age: Option<u32>, case: u8) -> Self {
        Self { household_id: Some(household_id.into()), age, case: Some(case) }
    }
}

/// Read person records from any CSV source with a header row.
///
/// # Errors
/// - [`DataError::Csv`] for unreadable input or cells that do not parse.
pub fn read_records<R: Read>(reader: R) -> DataResult<Vec<PersonRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Read person records from a CSV file.
pub fn read_records_csv<P: AsRef<Path>>(path: P) -> DataResult<Vec<PersonRecord>> {
    read_records(File::open(path)?)
}

/// Write person records as CSV with the `hh_id,age,case` header.
pub fn write_records_csv<W: Write>(writer: W, records: &[PersonRecord]) -> DataResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Settings for a seeded synthetic person table.
///
/// The default reproduces the standard test cohort: 1000 people spread over
/// `1000 / 3 = 333` household ids, ages on `0..100`, and a positive outcome
/// with probability `1 / 10001`, seeded with 42.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticCohort {
    pub people: usize,
    pub households: usize,
    /// Exclusive upper bound for ages.
    pub max_age: u32,
    pub case_probability: f64,
    pub seed: u64,
}

impl Default for SyntheticCohort {
    fn default() -> Self {
        Self {
            people: 1000,
            households: 1000 / 3,
            max_age: 100,
            case_probability: 1.0 / 10001.0,
            seed: 42,
        }
    }
}

impl SyntheticCohort {
    /// Generate the table. Identical settings give identical records.
    ///
    /// # Errors
    /// - [`DataError::InvalidCohort`] for zero people, households or ages, or
    ///   a case probability outside `[0, 1]`.
    pub fn generate(&self) -> DataResult<Vec<PersonRecord>> {
        if self.people == 0 || self.households == 0 || self.max_age == 0 {
            return Err(DataError::InvalidCohort {
                reason: "people, households and max_age must be positive".to_string(),
            });
        }
        let outcome = Bernoulli::new(self.case_probability)
            .map_err(|e| DataError::InvalidCohort { reason: e.to_string() })?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let records = (0..self.people)
            .map(|_| {
                let hh = rng.gen_range(0..self.households);
                let age = rng.gen_range(0..self.max_age);
                let case = u8::from(rng.sample(&outcome));
                PersonRecord::new(hh.to_string(), Some(age), case)
            })
            .collect();
        Ok(records)
    }
}
