//! Parameter layout and structured parameters for the household model.
//!
//! Purpose
//! -------
//! Give names and positions to the entries of the flat optimizer vector and
//! convert between that vector and a structured [`ModelParams`].
//!
//! Key behaviors
//! -------------
//! - [`ParamLayout`] fixes the order
//!   `llaL, llaG, logtheta, [eta], alpha[0..n], beta[0..n], gamma[0..n]`
//!   and provides index accessors, names, default bounds and the default
//!   starting point.
//! - [`ModelParams::from_theta`] / [`ModelParams::to_theta`] are exact
//!   inverses for any vector of the right length.
//!
//! Invariants & assumptions
//! ------------------------
//! - `len = 3 + n_age * 3`, plus one when household-size scaling is on.
//! - `eta` is stored raw and squashed by `(4/π)·atan(·)` on use, so the
//!   effective exponent lies in `(-2, 2)`.
//!
//! Conventions
//! -----------
//! - `alpha` scales external exposure, `beta` susceptibility to household
//!   transmission, `gamma` transmissibility; each has one coefficient per
//!   non-reference age band.
use ndarray::{Array1, s};

use crate::{
    model::errors::{ModelError, ModelResult},
    optimization::{
        errors::OptResult, loglik_optimizer::Bounds, numerical_stability::arctan_squash,
    },
};

/// Half-width of the squashed household-size exponent.
pub const ETA_HALF_WIDTH: f64 = 2.0;

const RATE_BOUNDS: (f64, f64) = (-5.0, 0.0);
const LOG_THETA_BOUNDS: (f64, f64) = (-10.0, 10.0);
const ETA_BOUNDS: (f64, f64) = (-10.0, 10.0);
const AGE_BOUNDS: (f64, f64) = (-3.0, 3.0);
const DEFAULT_LOG_RATE: f64 = -2.0;

/// Positions of the model parameters inside the optimizer vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    pub n_age: usize,
    pub household_scaling: bool,
}

impl ParamLayout {
    pub fn new(n_age: usize, household_scaling: bool) -> Self {
        Self { n_age, household_scaling }
    }

    fn n_scalar(&self) -> usize {
        if self.household_scaling { 4 } else { 3 }
    }

    pub fn len(&self) -> usize {
        self.n_scalar() + 3 * self.n_age
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn lla_l(&self) -> usize {
        0
    }

    pub fn lla_g(&self) -> usize {
        1
    }

    pub fn log_theta(&self) -> usize {
        2
    }

    pub fn eta(&self) -> Option<usize> {
        self.household_scaling.then_some(3)
    }

    pub fn alpha(&self, k: usize) -> usize {
        self.n_scalar() + k
    }

    pub fn beta(&self, k: usize) -> usize {
        self.n_scalar() + self.n_age + k
    }

    pub fn gamma(&self, k: usize) -> usize {
        self.n_scalar() + 2 * self.n_age + k
    }

    /// Parameter names in vector order, using `labels` for the age bands.
    ///
    /// Missing labels fall back to the band index.
    pub fn names<'a, I>(&self, labels: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let given: Vec<&str> = labels.into_iter().collect();
        let labels: Vec<String> = (0..self.n_age)
            .map(|k| given.get(k).map_or_else(|| k.to_string(), |l| l.to_string()))
            .collect();
        let mut names = vec!["llaL".to_string(), "llaG".to_string(), "logtheta".to_string()];
        if self.household_scaling {
            names.push("eta".to_string());
        }
        for group in ["alpha", "beta", "gamma"] {
            names.extend(labels.iter().map(|l| format!("{group}[{l}]")));
        }
        names
    }

    /// Box used by the estimator unless overridden.
    ///
    /// `llaL, llaG ∈ [-5, 0]`, `logtheta ∈ [-10, 10]`, `eta ∈ [-10, 10]`,
    /// age coefficients in `[-3, 3]`.
    pub fn default_bounds(&self) -> OptResult<Bounds> {
        let mut lower = Array1::from_elem(self.len(), AGE_BOUNDS.0);
        let mut upper = Array1::from_elem(self.len(), AGE_BOUNDS.1);
        let mut set = |i: usize, (lo, hi): (f64, f64)| {
            lower[i] = lo;
            upper[i] = hi;
        };
        set(self.lla_l(), RATE_BOUNDS);
        set(self.lla_g(), RATE_BOUNDS);
        set(self.log_theta(), LOG_THETA_BOUNDS);
        if let Some(i) = self.eta() {
            set(i, ETA_BOUNDS);
        }
        Bounds::new(lower, upper)
    }

    /// `llaL = llaG = -2`, everything else zero.
    pub fn default_start(&self) -> Array1<f64> {
        let mut x = Array1::zeros(self.len());
        x[self.lla_l()] = DEFAULT_LOG_RATE;
        x[self.lla_g()] = DEFAULT_LOG_RATE;
        x
    }

    /// Reject vectors of the wrong length or with non-finite entries.
    pub fn check(&self, x: &Array1<f64>) -> ModelResult<()> {
        if x.len() != self.len() {
            return Err(ModelError::ThetaLengthMismatch { expected: self.len(), actual: x.len() });
        }
        if let Some((index, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::InvalidThetaInput { index, value });
        }
        Ok(())
    }
}

/// Structured view of one parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Log within-household transmission rate.
    pub lla_l: f64,
    /// Log external (community) infection rate.
    pub lla_g: f64,
    /// Log of the gamma-frailty variance in `phi`.
    pub log_theta: f64,
    /// Unsquashed household-size exponent, if modelled.
    pub eta_raw: Option<f64>,
    pub alpha: Array1<f64>,
    pub beta: Array1<f64>,
    pub gamma: Array1<f64>,
}

impl ModelParams {
    /// # Errors
    /// - [`ModelError::ThetaLengthMismatch`] if `x.len() != layout.len()`.
    pub fn from_theta(x: &Array1<f64>, layout: &ParamLayout) -> ModelResult<Self> {
        if x.len() != layout.len() {
            return Err(ModelError::ThetaLengthMismatch { expected: layout.len(), actual: x.len() });
        }
        let n = layout.n_age;
        let a0 = layout.alpha(0);
        Ok(Self {
            lla_l: x[layout.lla_l()],
            lla_g: x[layout.lla_g()],
            log_theta: x[layout.log_theta()],
            eta_raw: layout.eta().map(|i| x[i]),
            alpha: x.slice(s![a0..a0 + n]).to_owned(),
            beta: x.slice(s![a0 + n..a0 + 2 * n]).to_owned(),
            gamma: x.slice(s![a0 + 2 * n..a0 + 3 * n]).to_owned(),
        })
    }

    pub fn to_theta(&self) -> Array1<f64> {
        let mut x = vec![self.lla_l, self.lla_g, self.log_theta];
        x.extend(self.eta_raw);
        x.extend(self.alpha.iter().chain(&self.beta).chain(&self.gamma).copied());
        Array1::from_vec(x)
    }

    /// Effective household-size exponent; zero when not modelled.
    pub fn eta(&self) -> f64 {
        self.eta_raw.map_or(0.0, |raw| arctan_squash(raw, ETA_HALF_WIDTH))
    }

    pub fn theta(&self) -> f64 {
        self.log_theta.exp()
    }
}
