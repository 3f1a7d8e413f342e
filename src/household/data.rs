//! Household containers built from person records.
//!
//! Purpose
//! -------
//! Group a flat person table into households, each carrying an outcome
//! vector and an aligned design matrix, and persist the result as a JSON
//! artifact so fits can be rerun without rebuilding it.
//!
//! Key behaviors
//! -------------
//! - [`HouseholdData::from_records`] groups records by household id in
//!   order of first appearance and keeps members in input order, so the
//!   `i`-th outcome and the `i`-th design row always describe the same
//!   person.
//! - Missing ids or outcomes and outcomes other than 0/1 are fatal
//!   [`DataError`]s carrying the record index.
//! - Missing ages fall into the reference class; they are counted and
//!   logged at `warn` level.
//! - JSON round trip via [`HouseholdData::to_json_writer`] /
//!   [`HouseholdData::from_json_reader`]; loading re-checks every
//!   household's shape against its age bands.
//!
//! Invariants & assumptions
//! ------------------------
//! - `outcomes.len() == design.nrows() >= 1` for every household.
//! - `design.ncols() == bands.len()`; every design row is one-hot or all
//!   zero.
//! - Households are immutable once built.
//!
//! Testing notes
//! -------------
//! - Unit tests cover grouping order, size-1 households, reference-class
//!   ages, each integrity error, and the JSON round trip.
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::{info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::household::{
    age::AgeBands,
    errors::{DataError, DataResult},
    records::PersonRecord,
};

/// One household: member outcomes and their age design rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: String,
    pub outcomes: Vec<u8>,
    pub design: Array2<f64>,
}

impl Household {
    pub fn size(&self) -> usize {
        self.outcomes.len()
    }

    pub fn cases(&self) -> usize {
        self.outcomes.iter().filter(|&&o| o == 1).count()
    }

    fn validate(&self, n_bands: usize) -> DataResult<()> {
        let fail = |reason: String| DataError::InconsistentHousehold { id: self.id.clone(), reason };
        if self.outcomes.is_empty() {
            return Err(fail("household has no members".to_string()));
        }
        if self.design.nrows() != self.outcomes.len() {
            return Err(fail(format!(
                "{} outcomes but {} design rows",
                self.outcomes.len(),
                self.design.nrows()
            )));
        }
        if self.design.ncols() != n_bands {
            return Err(fail(format!(
                "{} design columns for {n_bands} age bands",
                self.design.ncols()
            )));
        }
        if let Some(&o) = self.outcomes.iter().find(|&&o| o > 1) {
            return Err(fail(format!("outcome {o} is not 0 or 1")));
        }
        Ok(())
    }
}

/// Size and case counts of a dataset, for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSummary {
    pub households: usize,
    pub people: usize,
    pub cases: usize,
    pub largest_household: usize,
    pub most_cases: usize,
    pub missing_ages: usize,
}

/// All households of a dataset plus the age bands used to code them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdData {
    pub bands: AgeBands,
    pub households: Vec<Household>,
    #[serde(default)]
    pub missing_ages: usize,
}

impl HouseholdData {
    /// Build households from person records.
    ///
    /// # Errors
    /// - [`DataError::EmptyDataset`] for an empty table.
    /// - [`DataError::MissingHouseholdId`] for a missing or blank id.
    /// - [`DataError::MissingOutcome`] / [`DataError::InvalidOutcome`] for a
    ///   missing or non-binary outcome.
    pub fn from_records(records: &[PersonRecord], bands: &AgeBands) -> DataResult<Self> {
        if records.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut members: Vec<(&str, Vec<(u8, Option<usize>)>)> = Vec::new();
        let mut missing_ages = 0;

        for (i, record) in records.iter().enumerate() {
            let id = match record.household_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => id,
                _ => return Err(DataError::MissingHouseholdId { index: i }),
            };
            let outcome = record.case.ok_or(DataError::MissingOutcome { index: i })?;
            if outcome > 1 {
                return Err(DataError::InvalidOutcome { index: i, value: outcome });
            }
            if record.age.is_none() {
                missing_ages += 1;
            }
            let slot = *index.entry(id).or_insert_with(|| {
                members.push((id, Vec::new()));
                members.len() - 1
            });
            members[slot].1.push((outcome, bands.category(record.age)));
        }

        if missing_ages > 0 {
            warn!("{missing_ages} records have no age; coded as the reference age class");
        }

        let households = members
            .into_iter()
            .map(|(id, rows)| {
                let mut design = Array2::zeros((rows.len(), bands.len()));
                for (r, &(_, cat)) in rows.iter().enumerate() {
                    if let Some(k) = cat {
                        design[[r, k]] = 1.0;
                    }
                }
                Household {
                    id: id.to_string(),
                    outcomes: rows.into_iter().map(|(o, _)| o).collect(),
                    design,
                }
            })
            .collect();

        let data = Self { bands: bands.clone(), households, missing_ages };
        let s = data.summary();
        info!(
            "built {} households from {} records ({} cases, largest household {})",
            s.households, s.people, s.cases, s.largest_household
        );
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            households: self.households.len(),
            people: self.households.iter().map(Household::size).sum(),
            cases: self.households.iter().map(Household::cases).sum(),
            largest_household: self.households.iter().map(Household::size).max().unwrap_or(0),
            most_cases: self.households.iter().map(Household::cases).max().unwrap_or(0),
            missing_ages: self.missing_ages,
        }
    }

    /// Check every household against the band count.
    ///
    /// # Errors
    /// - [`DataError::EmptyDataset`] if there are no households.
    /// - [`DataError::InconsistentHousehold`] for the first bad household.
    pub fn validate(&self) -> DataResult<()> {
        if self.households.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        self.households.iter().try_for_each(|h| h.validate(self.bands.len()))
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> DataResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load and validate a dataset written by [`Self::to_json_writer`].
    pub fn from_json_reader<R: Read>(reader: R) -> DataResult<Self> {
        let data: Self = serde_json::from_reader(reader)?;
        data.validate()?;
        Ok(data)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> DataResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_json_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> DataResult<Self> {
        Self::from_json_reader(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table() -> Vec<PersonRecord> {
        vec![
            PersonRecord::new("h2", Some(40), 1),
            PersonRecord::new("h1", Some(5), 0),
            PersonRecord::new("h2", Some(12), 0),
            PersonRecord::new("h3", None, 1),
            PersonRecord::new("h2", Some(8), 1),
        ]
    }

    #[test]
    // Purpose
    // -------
    // Households appear in first-seen order with members in input order and
    // aligned design rows.
    //
    // Given
    // -----
    // - Records for h2, h1, h2, h3, h2 with default bands.
    //
    // Expect
    // ------
    // - Order h2, h1, h3; h2 outcomes [1, 0, 1] with rows adult, 10-18, 0-9.
    // - Size-1 households h1 and h3 are kept; h3's missing age is reference.
    fn from_records_groups_in_first_appearance_order() {
        // Arrange
        let bands = AgeBands::default();

        // Act
        let data = HouseholdData::from_records(&table(), &bands).expect("valid table");

        // Assert
        let ids: Vec<&str> = data.households.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["h2", "h1", "h3"]);
        let h2 = &data.households[0];
        assert_eq!(h2.outcomes, vec![1, 0, 1]);
        assert_eq!(h2.design, array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0]]);
        assert_eq!(data.households[1].design, array![[1.0, 0.0]]);
        assert_eq!(data.households[2].design, array![[0.0, 0.0]]);
        assert_eq!(data.missing_ages, 1);

        let s = data.summary();
        assert_eq!((s.households, s.people, s.cases), (3, 5, 3));
        assert_eq!((s.largest_household, s.most_cases), (3, 2));
    }

    #[test]
    // Purpose
    // -------
    // Integrity problems are fatal and name the offending record.
    fn from_records_surfaces_integrity_errors() {
        let bands = AgeBands::default();
        assert!(matches!(
            HouseholdData::from_records(&[], &bands),
            Err(DataError::EmptyDataset)
        ));

        let mut bad = table();
        bad[3].household_id = Some("  ".into());
        assert!(matches!(
            HouseholdData::from_records(&bad, &bands),
            Err(DataError::MissingHouseholdId { index: 3 })
        ));

        let mut bad = table();
        bad[1].case = None;
        assert!(matches!(
            HouseholdData::from_records(&bad, &bands),
            Err(DataError::MissingOutcome { index: 1 })
        ));

        let mut bad = table();
        bad[4].case = Some(2);
        assert!(matches!(
            HouseholdData::from_records(&bad, &bands),
            Err(DataError::InvalidOutcome { index: 4, value: 2 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The JSON artifact round-trips, and loading rejects a household whose
    // design does not match its outcomes.
    fn json_round_trip_and_validation() {
        // Arrange
        let data = HouseholdData::from_records(&table(), &AgeBands::default()).expect("valid");
        let mut buf = Vec::new();

        // Act
        data.to_json_writer(&mut buf).expect("serialize");
        let back = HouseholdData::from_json_reader(buf.as_slice()).expect("deserialize");

        // Assert
        assert_eq!(back, data);

        let mut broken = data.clone();
        broken.households[0].outcomes.pop();
        let mut buf = Vec::new();
        broken.to_json_writer(&mut buf).expect("serialize");
        assert!(matches!(
            HouseholdData::from_json_reader(buf.as_slice()),
            Err(DataError::InconsistentHousehold { .. })
        ));
    }
}
