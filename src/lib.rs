//! household_transmission — household final-size transmission model.
//!
//! Purpose
//! -------
//! Estimate within-household and external (community) infection from
//! per-person outcomes grouped by household, with age effects on external
//! exposure, susceptibility and transmissibility, and report the estimates
//! with confidence intervals.
//!
//! Key behaviors
//! -------------
//! - [`household`]: person records, age bands, household datasets and their
//!   CSV/JSON forms.
//! - [`model`]: Ball-matrix likelihood per household and the penalized
//!   dataset objective.
//! - [`optimization`]: argmin-based maximum likelihood with box constraints
//!   and seeded multi-start.
//! - [`inference`]: stencil-Hessian covariance, Monte Carlo intervals and
//!   derived epidemiological quantities.
//! - [`config`], [`reporting`], [`analysis`]: run configuration, the results
//!   log and the end-to-end pipeline used by the `hhfit` binary.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each layer returns its own error enum; nothing in the library panics on
//!   bad data or parameters.
//! - All randomness comes from explicit seeds.
//!
//! Downstream usage
//! ----------------
//! - Library callers typically build a [`household::HouseholdData`], a
//!   [`config::RunSettings`] and a [`reporting::Reporter`], then call
//!   [`analysis::run_fit`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/` holds the end-to-end
//!   pipeline test on a synthetic cohort.

pub mod analysis;
pub mod config;
pub mod household;
pub mod inference;
pub mod model;
pub mod optimization;
pub mod reporting;
