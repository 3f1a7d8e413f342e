//! Age-band mapping from raw ages to design-matrix rows.
//!
//! An [`AgeBands`] value is an ordered list of non-reference categories.
//! Each person gets a one-hot row with one column per band; an age that
//! falls in no band, or a missing age, is the reference class and gets the
//! all-zero row.
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::household::errors::{DataError, DataResult};

/// One non-reference age category with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub label: String,
    pub min: u32,
    pub max: u32,
}

impl AgeBand {
    pub fn new(label: impl Into<String>, min: u32, max: u32) -> Self {
        Self { label: label.into(), min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }
}

/// Validated, non-overlapping set of age bands.
///
/// Serialized as a plain list of bands; deserialization re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AgeBand>", into = "Vec<AgeBand>")]
pub struct AgeBands {
    bands: Vec<AgeBand>,
}

impl AgeBands {
    /// # Errors
    /// - [`DataError::InvalidAgeBand`] for an empty label or `min > max`.
    /// - [`DataError::OverlappingAgeBands`] if two bands share an age.
    pub fn new(bands: Vec<AgeBand>) -> DataResult<Self> {
        for band in &bands {
            if band.label.trim().is_empty() || band.min > band.max {
                return Err(DataError::InvalidAgeBand {
                    label: band.label.clone(),
                    min: band.min,
                    max: band.max,
                });
            }
        }
        for (i, a) in bands.iter().enumerate() {
            for b in &bands[i + 1..] {
                if a.min <= b.max && b.min <= a.max {
                    return Err(DataError::OverlappingAgeBands {
                        first: a.label.clone(),
                        second: b.label.clone(),
                    });
                }
            }
        }
        Ok(Self { bands })
    }

    /// Under-10s and 10–18 year olds against an adult reference class.
    pub fn children_and_teens() -> Self {
        Self { bands: vec![AgeBand::new("0-9", 0, 9), AgeBand::new("10-18", 10, 18)] }
    }

    /// A single 0–20 band against everyone older.
    pub fn under_21() -> Self {
        Self { bands: vec![AgeBand::new("0-20", 0, 20)] }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[AgeBand] {
        &self.bands
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|b| b.label.as_str())
    }

    /// Column index for `age`, or `None` for the reference class.
    pub fn category(&self, age: Option<u32>) -> Option<usize> {
        let age = age?;
        self.bands.iter().position(|b| b.contains(age))
    }

    /// One-hot design row for `age` (all zeros for the reference class).
    pub fn design_row(&self, age: Option<u32>) -> Array1<f64> {
        let mut row = Array1::zeros(self.len());
        if let Some(k) = self.category(age) {
            row[k] = 1.0;
        }
        row
    }
}

impl Default for AgeBands {
    fn default() -> Self {
        Self::children_and_teens()
    }
}

impl TryFrom<Vec<AgeBand>> for AgeBands {
    type Error = DataError;

    fn try_from(bands: Vec<AgeBand>) -> DataResult<Self> {
        Self::new(bands)
    }
}

impl From<AgeBands> for Vec<AgeBand> {
    fn from(bands: AgeBands) -> Self {
        bands.bands
    }
}
