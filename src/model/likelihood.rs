//! Dataset-level penalized negative log-likelihood.
//!
//! Purpose
//! -------
//! Sum the Ball-matrix contributions of every household, add the ridge
//! penalty, and expose the result both as a fallible function and as a
//! [`LogLikelihood`] the optimizer can maximize.
//!
//! Key behaviors
//! -------------
//! - [`HouseholdModel::prepare`] reorders members once, checks design widths
//!   and enforces the per-household case cap. Over-cap households are
//!   rejected, never skipped. The configurable cap can be lifted, but never
//!   past [`MAX_SUPPORTED_CASES`].
//! - [`HouseholdModel::try_neg_log_likelihood`] evaluates
//!   `Σ_h nll_h(x) + λ·Σ x²`, failing on the first broken household.
//! - [`HouseholdModel::objective`] is the same value with every failure
//!   mapped to `+∞`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Household terms are summed sequentially in dataset order. The parallel
//!   path only parallelizes the per-household map and collects in order, so
//!   both paths return bit-identical totals.
//! - The ridge applies to every entry of the parameter vector, in model
//!   space.
use log::debug;
use rayon::prelude::*;

use crate::{
    household::HouseholdData,
    model::{
        ball::{MAX_SUPPORTED_CASES, OrderedHousehold, household_nll},
        errors::{ModelError, ModelResult},
        params::{ModelParams, ParamLayout},
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Cost, LogLikelihood, Theta},
    },
};

/// Default cap on cases per household (the Ball matrix has `2^cases` rows).
pub const DEFAULT_MAX_CASES: usize = 10;

/// Households ready for repeated likelihood evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedHouseholds {
    pub households: Vec<OrderedHousehold>,
}

impl PreparedHouseholds {
    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }
}

/// The household final-size model with an optional ridge penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdModel {
    pub layout: ParamLayout,
    /// Ridge weight `λ >= 0`.
    pub ridge: f64,
    /// `None` disables the configurable cap; [`MAX_SUPPORTED_CASES`] still
    /// applies.
    pub max_cases: Option<usize>,
    pub parallel: bool,
}

impl HouseholdModel {
    /// # Errors
    /// - [`ModelError::InvalidRidge`] if `ridge` is negative or non-finite.
    pub fn new(layout: ParamLayout, ridge: f64) -> ModelResult<Self> {
        if !(ridge.is_finite() && ridge >= 0.0) {
            return Err(ModelError::InvalidRidge { value: ridge });
        }
        Ok(Self { layout, ridge, max_cases: Some(DEFAULT_MAX_CASES), parallel: false })
    }

    pub fn with_max_cases(mut self, max_cases: Option<usize>) -> Self {
        self.max_cases = max_cases;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reorder members and check every household against the model.
    ///
    /// # Errors
    /// - [`ModelError::EmptyData`] for a dataset without households.
    /// - [`ModelError::DesignWidthMismatch`] if a design does not have
    ///   `layout.n_age` columns.
    /// - [`ModelError::TooManyCases`] if a household exceeds the case cap,
    ///   or [`MAX_SUPPORTED_CASES`] when the cap is higher or disabled.
    pub fn prepare(&self, data: &HouseholdData) -> ModelResult<PreparedHouseholds> {
        if data.is_empty() {
            return Err(ModelError::EmptyData);
        }
        let cap = self.case_limit();
        let households = data
            .households
            .iter()
            .enumerate()
            .map(|(index, hh)| {
                if hh.design.ncols() != self.layout.n_age {
                    return Err(ModelError::DesignWidthMismatch {
                        household: index,
                        expected: self.layout.n_age,
                        found: hh.design.ncols(),
                    });
                }
                let cases = hh.cases();
                if cases > cap {
                    return Err(ModelError::TooManyCases { household: index, cases, cap });
                }
                Ok(OrderedHousehold::new(index, hh))
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(PreparedHouseholds { households })
    }

    /// Case limit in force: the configured cap, bounded by
    /// [`MAX_SUPPORTED_CASES`].
    pub fn case_limit(&self) -> usize {
        self.max_cases.map_or(MAX_SUPPORTED_CASES, |cap| cap.min(MAX_SUPPORTED_CASES))
    }

    /// Ridge term `λ·Σ x²`.
    pub fn penalty(&self, x: &Theta) -> f64 {
        self.ridge * x.dot(x)
    }

    /// Penalized negative log-likelihood at `x`.
    ///
    /// # Errors
    /// - [`ModelError::ThetaLengthMismatch`] / [`ModelError::InvalidThetaInput`]
    ///   for a malformed vector.
    /// - [`ModelError::NumericalFailure`] from the first failing household.
    pub fn try_neg_log_likelihood(&self, x: &Theta, data: &PreparedHouseholds) -> ModelResult<f64> {
        self.layout.check(x)?;
        let params = ModelParams::from_theta(x, &self.layout)?;
        let terms: Vec<f64> = if self.parallel {
            data.households
                .par_iter()
                .map(|hh| household_nll(hh, &params))
                .collect::<ModelResult<Vec<_>>>()?
        } else {
            data.households
                .iter()
                .map(|hh| household_nll(hh, &params))
                .collect::<ModelResult<Vec<_>>>()?
        };
        Ok(terms.iter().sum::<f64>() + self.penalty(x))
    }

    /// Penalized negative log-likelihood, `+∞` on any failure.
    pub fn objective(&self, x: &Theta, data: &PreparedHouseholds) -> f64 {
        match self.try_neg_log_likelihood(x, data) {
            Ok(v) if v.is_finite() => v,
            Ok(v) => {
                debug!("objective is {v}");
                f64::INFINITY
            }
            Err(e) => {
                debug!("objective failed: {e}");
                f64::INFINITY
            }
        }
    }
}

impl LogLikelihood for HouseholdModel {
    type Data = PreparedHouseholds;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        Ok(-self.try_neg_log_likelihood(theta, data)?)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        self.layout.check(theta)?;
        if data.is_empty() {
            return Err(ModelError::EmptyData.into());
        }
        Ok(())
    }
}
