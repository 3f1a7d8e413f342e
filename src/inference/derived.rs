//! inference::derived — epidemiological summaries of a fitted model.
//!
//! Purpose
//! -------
//! Translate the fitted parameter vector and its covariance into the
//! quantities reported to users, each with a point value and, where the
//! uncertainty allows, an interval at the configured level.
//!
//! Key behaviors
//! -------------
//! - External infection probability `100·(1 - exp(-exp(llaG)))` with the
//!   analytic interval from `llaG ± z·se`.
//! - Secondary attack rate `100·(1 - phi(exp(llaL)·k^eta, logtheta))`, for
//!   every configured household size `k` when household-size scaling is
//!   modelled, otherwise a single baseline value. Intervals come from
//!   Monte Carlo draws of `(llaL, logtheta[, eta])` under their joint
//!   normal approximation.
//! - Relative external exposure, susceptibility and transmissibility per
//!   age band: `100·exp(coef)` with `coef ± z·se`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `z` is the standard normal quantile at `(1 + level)/2`.
//! - Point values never depend on the covariance; a missing covariance or
//!   standard error only removes the interval.
//! - Non-finite Monte Carlo draws are discarded and counted per estimate.
//! - Draws come from one `StdRng` seeded once per call, consumed in the
//!   order the estimates are listed.
//!
//! Testing notes
//! -------------
//! - Unit tests check the analytic intervals and point values against
//!   hand computation, and that the SAR interval brackets its point value.
use ndarray::Array1;
use rand::{SeedableRng, rngs::StdRng};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::{
    inference::{
        errors::{InferenceError, InferenceResult},
        hessian::Covariance,
        sampling::{MvnSampler, empirical_interval},
    },
    model::{
        ball::phi,
        params::{ETA_HALF_WIDTH, ModelParams, ParamLayout},
    },
    optimization::numerical_stability::arctan_squash,
};

/// Settings for derived quantities.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedOptions {
    /// Confidence level in `(0, 1)`.
    pub level: f64,
    /// Monte Carlo draws per SAR estimate.
    pub draws: usize,
    pub seed: u64,
    /// Household sizes for size-specific SARs.
    pub household_sizes: Vec<usize>,
}

impl Default for DerivedOptions {
    fn default() -> Self {
        Self { level: 0.95, draws: 4000, seed: 46, household_sizes: (2..=6).collect() }
    }
}

impl DerivedOptions {
    /// # Errors
    /// - [`InferenceError::InvalidLevel`] / [`InferenceError::InvalidDrawCount`].
    pub fn validate(&self) -> InferenceResult<()> {
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(InferenceError::InvalidLevel { level: self.level });
        }
        if self.draws == 0 {
            return Err(InferenceError::InvalidDrawCount { draws: self.draws });
        }
        Ok(())
    }
}

/// One reported quantity, on the percent scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub name: String,
    pub value: f64,
    pub interval: Option<(f64, f64)>,
    /// Monte Carlo draws dropped as non-finite (zero for analytic intervals).
    pub discarded: usize,
}

/// Standard normal quantile for a two-sided interval at `level`.
///
/// # Errors
/// - [`InferenceError::InvalidLevel`] unless `0 < level < 1`.
pub fn z_value(level: f64) -> InferenceResult<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(InferenceError::InvalidLevel { level });
    }
    let normal = Normal::new(0.0, 1.0).map_err(|_| InferenceError::InvalidLevel { level })?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

fn analytic(
    name: String, coef: f64, se: Option<f64>, z: f64, transform: impl Fn(f64) -> f64,
) -> Estimate {
    Estimate {
        name,
        value: transform(coef),
        interval: se.map(|se| (transform(coef - z * se), transform(coef + z * se))),
        discarded: 0,
    }
}

/// External infection probability.
pub fn external_infection(lla_g: f64, se: Option<f64>, z: f64) -> Estimate {
    analytic("external infection probability".to_string(), lla_g, se, z, |v| {
        100.0 * (1.0 - (-v.exp()).exp())
    })
}

/// Per-band relative external exposure, susceptibility and transmissibility.
pub fn relative_effects(
    x_hat: &Array1<f64>, cov: Option<&Covariance>, layout: &ParamLayout, labels: &[String], z: f64,
) -> Vec<Estimate> {
    let groups = ["relative external exposure", "relative susceptibility", "relative transmissibility"];
    let mut out = Vec::with_capacity(3 * layout.n_age);
    for (g, what) in groups.into_iter().enumerate() {
        for k in 0..layout.n_age {
            let i = match g {
                0 => layout.alpha(k),
                1 => layout.beta(k),
                _ => layout.gamma(k),
            };
            let band = labels.get(k).map_or_else(|| k.to_string(), String::clone);
            let se = cov.and_then(|c| c.standard_error(i));
            out.push(analytic(format!("{what} [{band}]"), x_hat[i], se, z, |v| 100.0 * v.exp()));
        }
    }
    out
}

fn sar(lla_l: f64, log_theta: f64, eta: f64, size: f64) -> f64 {
    100.0 * (1.0 - phi(lla_l.exp() * size.powf(eta), log_theta))
}

/// Secondary attack rates with Monte Carlo intervals.
///
/// # Errors
/// - Sampler construction errors ([`InferenceError::SamplerDimMismatch`],
///   [`InferenceError::NonFiniteSamplerInput`]) and
///   [`InferenceError::IndexOutOfRange`].
pub fn secondary_attack_rates(
    params: &ModelParams, x_hat: &Array1<f64>, cov: Option<&Covariance>, layout: &ParamLayout,
    opts: &DerivedOptions,
) -> InferenceResult<Vec<Estimate>> {
    let mut indices = vec![layout.lla_l(), layout.log_theta()];
    indices.extend(layout.eta());
    if let Some(&index) = indices.iter().find(|&&i| i >= x_hat.len()) {
        return Err(InferenceError::IndexOutOfRange { index, len: x_hat.len() });
    }

    let sampler = match cov {
        Some(c) => {
            let mean = indices.iter().map(|&i| x_hat[i]).collect::<Array1<f64>>();
            Some(MvnSampler::new(mean, &c.submatrix(&indices)?)?)
        }
        None => None,
    };
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let sizes: Vec<Option<usize>> = if layout.household_scaling {
        opts.household_sizes.iter().copied().map(Some).collect()
    } else {
        vec![None]
    };

    let mut out = Vec::with_capacity(sizes.len());
    for size in sizes {
        let (name, k) = match size {
            Some(k) => (format!("secondary attack rate [household size {k}]"), k as f64),
            None => ("baseline secondary attack rate".to_string(), 1.0),
        };
        let value = sar(params.lla_l, params.log_theta, params.eta(), k);
        let mc = sampler.as_ref().map(|s| {
            let values = (0..opts.draws).map(|_| {
                let u = s.sample(&mut rng);
                let eta = u.get(2).map_or(0.0, |&raw| arctan_squash(raw, ETA_HALF_WIDTH));
                sar(u[0], u[1], eta, k)
            });
            empirical_interval(values, opts.level)
        });
        out.push(Estimate {
            name,
            value,
            interval: mc.and_then(|m| m.bounds),
            discarded: mc.map_or(0, |m| m.discarded),
        });
    }
    Ok(out)
}

/// All derived quantities in report order.
///
/// # Errors
/// - Invalid options, or any error from [`secondary_attack_rates`].
pub fn derive_all(
    x_hat: &Array1<f64>, cov: Option<&Covariance>, layout: &ParamLayout, labels: &[String],
    opts: &DerivedOptions,
) -> InferenceResult<Vec<Estimate>> {
    opts.validate()?;
    let z = z_value(opts.level)?;
    let params = ModelParams::from_theta(x_hat, layout).map_err(|_| {
        InferenceError::IndexOutOfRange { index: layout.len().saturating_sub(1), len: x_hat.len() }
    })?;

    let mut out = vec![external_infection(
        params.lla_g,
        cov.and_then(|c| c.standard_error(layout.lla_g())),
        z,
    )];
    out.extend(secondary_attack_rates(&params, x_hat, cov, layout, opts)?);
    out.extend(relative_effects(x_hat, cov, layout, labels, z));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn diag_cov(se: &[f64]) -> Covariance {
        let n = se.len();
        let matrix = Array2::from_shape_fn((n, n), |(i, j)| if i == j { se[i] * se[i] } else { 0.0 });
        Covariance {
            hessian: Array2::eye(n),
            matrix,
            standard_errors: se.iter().map(|&s| Some(s)).collect(),
            steps: Array1::from_elem(n, 1e-4),
        }
    }

    #[test]
    // Purpose
    // -------
    // The 95% quantile is 1.96 and bad levels are rejected.
    fn z_value_matches_normal_quantile() {
        assert_relative_eq!(z_value(0.95).expect("valid"), 1.959964, epsilon = 1e-6);
        assert!(matches!(z_value(1.0), Err(InferenceError::InvalidLevel { .. })));
        assert!(matches!(z_value(0.0), Err(InferenceError::InvalidLevel { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Analytic summaries match hand computation and a missing standard
    // error removes only the interval.
    //
    // Given
    // -----
    // - One age band, llaG = -1 with se 0.1, alpha = 0.2 with se 0.05.
    //
    // Expect
    // ------
    // - External probability 100(1 - e^{-e^{-1}}) with the llaG ± z·se
    //   interval; relative exposure 100·e^{0.2}.
    fn analytic_estimates() {
        // Arrange
        let layout = ParamLayout::new(1, false);
        let x = array![-0.7, -1.0, 0.1, 0.2, 0.0, 0.0];
        let cov = diag_cov(&[0.1, 0.1, 0.1, 0.05, 0.05, 0.05]);
        let z = 1.96;

        // Act
        let ext = external_infection(-1.0, Some(0.1), z);
        let rel = relative_effects(&x, Some(&cov), &layout, &["0-9".to_string()], z);

        // Assert
        let p = |v: f64| 100.0 * (1.0 - (-v.exp()).exp());
        assert_relative_eq!(ext.value, p(-1.0), epsilon = 1e-12);
        let (lo, hi) = ext.interval.expect("se given");
        assert_relative_eq!(lo, p(-1.196), epsilon = 1e-12);
        assert_relative_eq!(hi, p(-0.804), epsilon = 1e-12);
        assert!(external_infection(-1.0, None, z).interval.is_none());

        assert_eq!(rel.len(), 3);
        assert_eq!(rel[0].name, "relative external exposure [0-9]");
        assert_relative_eq!(rel[0].value, 100.0 * 0.2f64.exp(), epsilon = 1e-12);
        let (lo, hi) = rel[0].interval.expect("se given");
        assert_relative_eq!(lo, 100.0 * (0.2f64 - z * 0.05).exp(), epsilon = 1e-12);
        assert_relative_eq!(hi, 100.0 * (0.2f64 + z * 0.05).exp(), epsilon = 1e-12);
        assert_eq!(rel[2].name, "relative transmissibility [0-9]");
    }

    #[test]
    // Purpose
    // -------
    // SAR estimates cover every configured household size when scaling is
    // modelled, their intervals bracket the point value, and the draws are
    // reproducible.
    fn sar_by_household_size() {
        // Arrange
        let layout = ParamLayout::new(0, true);
        let x = array![-1.0, -2.0, 0.5, 0.3];
        let params = ModelParams::from_theta(&x, &layout).expect("len 4");
        let cov = diag_cov(&[0.05, 0.05, 0.05, 0.05]);
        let opts = DerivedOptions { draws: 2000, ..DerivedOptions::default() };

        // Act
        let a = secondary_attack_rates(&params, &x, Some(&cov), &layout, &opts).expect("valid");
        let b = secondary_attack_rates(&params, &x, Some(&cov), &layout, &opts).expect("valid");
        let none = secondary_attack_rates(&params, &x, None, &layout, &opts).expect("valid");

        // Assert
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a[0].name, "secondary attack rate [household size 2]");
        for est in &a {
            let (lo, hi) = est.interval.expect("covariance given");
            assert!(lo < est.value && est.value < hi);
            assert_eq!(est.discarded, 0);
        }
        assert!(a[4].value > a[0].value);
        assert!(none.iter().all(|e| e.interval.is_none()));

        let plain = ParamLayout::new(0, false);
        let x = array![-1.0, -2.0, 0.5];
        let p = ModelParams::from_theta(&x, &plain).expect("len 3");
        let base = secondary_attack_rates(&p, &x, None, &plain, &opts).expect("valid");
        assert_eq!(base.len(), 1);
        assert_relative_eq!(base[0].value, 100.0 * (1.0 - phi((-1.0f64).exp(), 0.5)), epsilon = 1e-12);
    }
}
