//! analysis — end-to-end household fit.
//!
//! Purpose
//! -------
//! Run the full chain for one dataset: prepare households, fit by
//! multi-start bounded optimization, compute the covariance at the selected
//! estimate, derive the reported quantities, and send every step to a
//! [`Reporter`].
//!
//! Key behaviors
//! -------------
//! - [`load_households`] reads either a person CSV (built with the
//!   configured bands) or a prepared JSON dataset.
//! - [`run_fit`] never aborts on per-run solver failures or on a singular
//!   Hessian: failed runs are logged and excluded from selection, and a
//!   covariance failure withholds intervals but keeps point estimates.
//! - Data, model-construction and reporter errors are fatal and returned as
//!   [`AnalysisError`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The dataset's age bands must equal the configured bands, so design
//!   columns line up with the parameter layout.
//! - All randomness comes from the seeds in [`RunSettings`].
use std::path::Path;

use log::{info, warn};
use ndarray::Array1;

use crate::{
    config::{ConfigError, RunSettings},
    household::{AgeBands, DataError, DatasetSummary, HouseholdData, read_records_csv},
    inference::{Covariance, Estimate, InferenceError, calc_covariance, derive_all},
    model::ModelError,
    optimization::{
        errors::OptError,
        multistart::{MultiStartOutcome, multistart},
    },
    reporting::{Event, ReportError, Reporter},
};

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    Data(DataError),
    Model(ModelError),
    Optimizer(OptError),
    Inference(InferenceError),
    Config(ConfigError),
    Report(ReportError),
    /// Dataset was coded with different age bands than the model expects.
    BandsMismatch { data: Vec<String>, config: Vec<String> },
}

impl std::error::Error for AnalysisError {}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Data(e) => write!(f, "{e}"),
            AnalysisError::Model(e) => write!(f, "{e}"),
            AnalysisError::Optimizer(e) => write!(f, "{e}"),
            AnalysisError::Inference(e) => write!(f, "{e}"),
            AnalysisError::Config(e) => write!(f, "{e}"),
            AnalysisError::Report(e) => write!(f, "{e}"),
            AnalysisError::BandsMismatch { data, config } => write!(
                f,
                "Dataset age bands {data:?} differ from configured bands {config:?}"
            ),
        }
    }
}

impl From<DataError> for AnalysisError {
    fn from(err: DataError) -> Self {
        AnalysisError::Data(err)
    }
}

impl From<ModelError> for AnalysisError {
    fn from(err: ModelError) -> Self {
        AnalysisError::Model(err)
    }
}

impl From<OptError> for AnalysisError {
    fn from(err: OptError) -> Self {
        AnalysisError::Optimizer(err)
    }
}

impl From<InferenceError> for AnalysisError {
    fn from(err: InferenceError) -> Self {
        AnalysisError::Inference(err)
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(err: ConfigError) -> Self {
        AnalysisError::Config(err)
    }
}

impl From<ReportError> for AnalysisError {
    fn from(err: ReportError) -> Self {
        AnalysisError::Report(err)
    }
}

/// Everything a fit produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub summary: DatasetSummary,
    /// Parameter names in layout order.
    pub names: Vec<String>,
    pub initial_objective: f64,
    pub multistart: MultiStartOutcome,
    /// Selected estimate, if any run succeeded.
    pub x_hat: Option<Array1<f64>>,
    pub covariance: Option<Covariance>,
    /// Why the covariance is missing when an estimate exists.
    pub covariance_error: Option<InferenceError>,
    pub estimates: Vec<Estimate>,
}

/// Load households from a `.json` dataset or a person-level CSV.
///
/// CSV input is grouped with `bands`; JSON input keeps its stored bands.
pub fn load_households<P: AsRef<Path>>(path: P, bands: &AgeBands) -> AnalysisResult<HouseholdData> {
    let path = path.as_ref();
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let data = if is_json {
        HouseholdData::read_json(path)?
    } else {
        HouseholdData::from_records(&read_records_csv(path)?, bands)?
    };
    info!("loaded {} households from {}", data.len(), path.display());
    Ok(data)
}

/// Fit the household model and report every step.
///
/// # Errors
/// - [`AnalysisError::BandsMismatch`] if `data` was built with other bands.
/// - [`AnalysisError::Data`] / [`AnalysisError::Model`] for invalid data,
///   including households above the case cap.
/// - [`AnalysisError::Optimizer`] if a restart cannot find a finite start.
/// - [`AnalysisError::Report`] if the reporter fails.
pub fn run_fit<R: Reporter>(
    data: &HouseholdData, settings: &RunSettings, reporter: &mut R,
) -> AnalysisResult<FitReport> {
    if data.bands != settings.bands {
        return Err(AnalysisError::BandsMismatch {
            data: data.bands.labels().map(str::to_string).collect(),
            config: settings.bands.labels().map(str::to_string).collect(),
        });
    }
    data.validate()?;
    let summary = data.summary();
    reporter.report(&Event::Dataset(&summary))?;

    let model = &settings.model;
    let prepared = model.prepare(data)?;
    let names = settings.layout.names(settings.bands.labels());

    let initial_objective = model.objective(&settings.start, &prepared);
    reporter.report(&Event::Start { x: &settings.start, objective: initial_objective })?;

    let mut report_error = None;
    let outcome = multistart(
        model,
        &prepared,
        &settings.bounds,
        Some(&settings.start),
        &settings.mle,
        &settings.multistart,
        |index, fit| {
            if report_error.is_none() {
                report_error = reporter.report(&Event::Run { index, fit }).err();
            }
        },
    )?;
    if let Some(err) = report_error {
        return Err(err.into());
    }

    let Some((index, best)) = outcome.best.zip(outcome.best_fit()) else {
        reporter.report(&Event::NoSuccessfulRun { runs: outcome.runs.len() })?;
        return Ok(FitReport {
            summary,
            names,
            initial_objective,
            multistart: outcome,
            x_hat: None,
            covariance: None,
            covariance_error: None,
            estimates: Vec::new(),
        });
    };
    reporter.report(&Event::Selected { index, fit: best })?;
    let x_hat = best.x_hat.clone();

    let objective = |x: &Array1<f64>| model.objective(x, &prepared);
    let (covariance, covariance_error) = match calc_covariance(&objective, &x_hat, &settings.steps) {
        Ok(cov) => {
            reporter.report(&Event::StandardErrors { names: &names, values: &cov.standard_errors })?;
            (Some(cov), None)
        }
        Err(e) => {
            warn!("covariance failed at the selected estimate: {e}");
            reporter.report(&Event::CovarianceFailed { reason: &e.to_string() })?;
            (None, Some(e))
        }
    };

    let labels: Vec<String> = settings.bands.labels().map(str::to_string).collect();
    let estimates =
        derive_all(&x_hat, covariance.as_ref(), &settings.layout, &labels, &settings.derived)?;
    for estimate in &estimates {
        if estimate.discarded > 0 {
            warn!("{}: {} Monte Carlo draws were not finite", estimate.name, estimate.discarded);
        }
        reporter.report(&Event::Estimate(estimate))?;
    }

    Ok(FitReport {
        summary,
        names,
        initial_objective,
        multistart: outcome,
        x_hat: Some(x_hat),
        covariance,
        covariance_error,
        estimates,
    })
}
