//! config — TOML run configuration for a household fit.
//!
//! Purpose
//! -------
//! Describe one analysis run in a small TOML file and turn it into the typed
//! options each layer consumes. Every field has a default, so an empty file
//! (or no file) is a valid configuration.
//!
//! Key behaviors
//! -------------
//! - [`AnalysisConfig`] mirrors the file: `[data]`, `[model]`,
//!   `[optimizer]` and `[inference]` tables.
//! - [`AnalysisConfig::validate`] parses solver names, checks tolerances,
//!   step rules and levels, and returns a [`RunSettings`] bundle.
//! - Command-line overrides are applied to the config before validation
//!   (see the `hhfit` binary).
//!
//! Conventions
//! -----------
//! - `model.max_cases = 0` disables the configurable case cap; households
//!   above [`MAX_SUPPORTED_CASES`](crate::model::MAX_SUPPORTED_CASES) are
//!   still rejected.
//! - `optimizer.line_search` is one of `MoreThuente`, `HagerZhang` or
//!   `Backtracking`.
//! - `optimizer.start`, when given, is a full model-space parameter vector
//!   in layout order; otherwise the default start is used.
//!
//! Example
//! -------
//! ```toml
//! [data]
//! bands = [{ label = "0-20", min = 0, max = 20 }]
//!
//! [model]
//! household_scaling = true
//! ridge = 7.4
//!
//! [optimizer]
//! solver = "nelder-mead"
//! restarts = 5
//! ```
use std::{fs, path::Path};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{
    household::AgeBands,
    inference::{DerivedOptions, InferenceError, StepRule},
    model::{DEFAULT_MAX_CASES, HouseholdModel, ModelError, ParamLayout},
    optimization::{
        errors::OptError,
        loglik_optimizer::{
            Bounds, DEFAULT_LBFGS_MEM, DEFAULT_SIMPLEX_STEP, LineSearcher, MLEOptions, Solver,
            Tolerances,
        },
        multistart::{DEFAULT_MAX_DRAWS, MultiStartOptions},
    },
};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: String, text: String },
    /// The file is not valid TOML for [`AnalysisConfig`].
    Parse { text: String },
    /// A start vector has the wrong length for the layout.
    StartLength { expected: usize, found: usize },
    /// Optimizer option rejected.
    Optimizer(OptError),
    /// Model option rejected.
    Model(ModelError),
    /// Inference option rejected.
    Inference(InferenceError),
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, text } => write!(f, "Cannot read config '{path}': {text}"),
            ConfigError::Parse { text } => write!(f, "Invalid config: {text}"),
            ConfigError::StartLength { expected, found } => {
                write!(f, "Start vector has {found} entries, the model has {expected} parameters")
            }
            ConfigError::Optimizer(e) => write!(f, "Invalid optimizer settings: {e}"),
            ConfigError::Model(e) => write!(f, "Invalid model settings: {e}"),
            ConfigError::Inference(e) => write!(f, "Invalid inference settings: {e}"),
        }
    }
}

impl From<OptError> for ConfigError {
    fn from(err: OptError) -> Self {
        ConfigError::Optimizer(err)
    }
}

impl From<ModelError> for ConfigError {
    fn from(err: ModelError) -> Self {
        ConfigError::Model(err)
    }
}

impl From<InferenceError> for ConfigError {
    fn from(err: InferenceError) -> Self {
        ConfigError::Inference(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse { text: err.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub bands: AgeBands,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { bands: AgeBands::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model the `m^eta` household-size scaling of transmission.
    pub household_scaling: bool,
    pub ridge: f64,
    pub max_cases: usize,
    /// Evaluate households on the rayon pool.
    pub parallel: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { household_scaling: false, ridge: 0.0, max_cases: DEFAULT_MAX_CASES, parallel: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub solver: String,
    pub line_search: String,
    pub tol_grad: f64,
    pub tol_cost: f64,
    pub max_iter: usize,
    pub lbfgs_mem: usize,
    pub simplex_step: f64,
    /// Random restarts after the fixed start.
    pub restarts: usize,
    pub seed: u64,
    pub max_draws: usize,
    pub start: Option<Vec<f64>>,
    pub verbose: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let ms = MultiStartOptions::default();
        Self {
            solver: "lbfgs".to_string(),
            line_search: "MoreThuente".to_string(),
            tol_grad: 1e-6,
            tol_cost: 1e-9,
            max_iter: 1000,
            lbfgs_mem: DEFAULT_LBFGS_MEM,
            simplex_step: DEFAULT_SIMPLEX_STEP,
            restarts: ms.restarts,
            seed: ms.seed,
            max_draws: DEFAULT_MAX_DRAWS,
            start: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub level: f64,
    pub draws: usize,
    pub seed: u64,
    pub household_sizes: Vec<usize>,
    pub relative_step: f64,
    pub min_step: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let derived = DerivedOptions::default();
        let steps = StepRule::default();
        Self {
            level: derived.level,
            draws: derived.draws,
            seed: derived.seed,
            household_sizes: derived.household_sizes,
            relative_step: steps.relative,
            min_step: steps.min_step,
        }
    }
}

/// Whole-run configuration as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    pub inference: InferenceConfig,
}

/// Validated, typed settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub bands: AgeBands,
    pub layout: ParamLayout,
    pub model: HouseholdModel,
    pub bounds: Bounds,
    pub start: Array1<f64>,
    pub mle: MLEOptions,
    pub multistart: MultiStartOptions,
    pub steps: StepRule,
    pub derived: DerivedOptions,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            text: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every section and build typed settings.
    ///
    /// # Errors
    /// - [`ConfigError::Optimizer`] for unknown solver or line-search names,
    ///   bad tolerances, zero L-BFGS memory or a bad simplex step, and for a
    ///   start vector outside the default bounds.
    /// - [`ConfigError::Model`] for a negative ridge.
    /// - [`ConfigError::Inference`] for a bad step rule, level or draw count.
    /// - [`ConfigError::StartLength`] for a start of the wrong length.
    pub fn validate(&self) -> ConfigResult<RunSettings> {
        let bands = self.data.bands.clone();
        let layout = ParamLayout::new(bands.len(), self.model.household_scaling);

        let max_cases = (self.model.max_cases > 0).then_some(self.model.max_cases);
        let model = HouseholdModel::new(layout, self.model.ridge)?
            .with_max_cases(max_cases)
            .with_parallel(self.model.parallel);

        let o = &self.optimizer;
        let tols = Tolerances::new(Some(o.tol_grad), Some(o.tol_cost), Some(o.max_iter))?;
        let solver: Solver = o.solver.parse()?;
        let line_searcher: LineSearcher = o.line_search.parse()?;
        let mle = MLEOptions::new(tols, solver, line_searcher, Some(o.lbfgs_mem))?
            .with_simplex_step(o.simplex_step)?
            .with_verbose(o.verbose);
        let multistart = MultiStartOptions { restarts: o.restarts, seed: o.seed, max_draws: o.max_draws };

        let bounds = layout.default_bounds()?;
        let start = match &o.start {
            Some(v) if v.len() != layout.len() => {
                return Err(ConfigError::StartLength { expected: layout.len(), found: v.len() });
            }
            Some(v) => Array1::from_vec(v.clone()),
            None => layout.default_start(),
        };
        bounds.to_unconstrained(&start)?;

        let i = &self.inference;
        let steps = StepRule::new(i.relative_step, i.min_step)?;
        let derived = DerivedOptions {
            level: i.level,
            draws: i.draws,
            seed: i.seed,
            household_sizes: i.household_sizes.clone(),
        };
        derived.validate()?;

        Ok(RunSettings { bands, layout, model, bounds, start, mle, multistart, steps, derived })
    }
}
