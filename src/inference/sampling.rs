//! Multivariate-normal draws and empirical percentile intervals.
//!
//! [`MvnSampler`] draws from `N(μ, Σ)` through a factor `L` with
//! `Σ = L Lᵀ`: the Cholesky factor when `Σ` is positive definite, otherwise
//! the symmetric eigen factor `Q·diag(√λ)`. Eigenvalues below
//! `-EIGEN_EPS · max|λ|` have no real square root and make every draw NaN;
//! callers discard non-finite draws, so such a covariance yields no
//! interval rather than a wrong one.
//!
//! [`percentile`] interpolates linearly between order statistics (the
//! "linear" rule: position `q·(n-1)` in the sorted sample).
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::numerical_stability::EIGEN_EPS,
};

/// How the covariance was factorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factorization {
    Cholesky,
    Eigen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MvnSampler {
    mean: Array1<f64>,
    factor: Array2<f64>,
    factorization: Factorization,
}

impl MvnSampler {
    /// # Errors
    /// - [`InferenceError::SamplerDimMismatch`] unless `cov` is square with
    ///   side `mean.len()`.
    /// - [`InferenceError::NonFiniteSamplerInput`] for NaN/±inf entries.
    pub fn new(mean: Array1<f64>, cov: &Array2<f64>) -> InferenceResult<Self> {
        let n = mean.len();
        if cov.nrows() != n || cov.ncols() != n {
            return Err(InferenceError::SamplerDimMismatch {
                mean: n,
                rows: cov.nrows(),
                cols: cov.ncols(),
            });
        }
        if mean.iter().chain(cov.iter()).any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFiniteSamplerInput);
        }

        let sigma = DMatrix::from_fn(n, n, |i, j| cov[[i, j]]);
        if let Some(chol) = sigma.clone().cholesky() {
            let l = chol.l();
            return Ok(Self {
                mean,
                factor: Array2::from_shape_fn((n, n), |(i, j)| l[(i, j)]),
                factorization: Factorization::Cholesky,
            });
        }

        let eig = sigma.symmetric_eigen();
        let scale = eig.eigenvalues.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let roots: Vec<f64> = eig
            .eigenvalues
            .iter()
            .map(|&lambda| if lambda.abs() <= EIGEN_EPS * scale { 0.0 } else { lambda.sqrt() })
            .collect();
        let q = eig.eigenvectors;
        Ok(Self {
            mean,
            factor: Array2::from_shape_fn((n, n), |(i, k)| q[(i, k)] * roots[k]),
            factorization: Factorization::Eigen,
        })
    }

    pub fn factorization(&self) -> Factorization {
        self.factorization
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Array1<f64> {
        let z: Array1<f64> = (0..self.dim()).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        &self.mean + &self.factor.dot(&z)
    }
}

/// Linear-interpolation percentile of an ascending slice, `q ∈ [0, 1]`.
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Central interval of a Monte Carlo sample after dropping non-finite values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmpiricalInterval {
    /// `None` when every value was discarded.
    pub bounds: Option<(f64, f64)>,
    pub kept: usize,
    pub discarded: usize,
}

/// Percentiles `(1 - level)/2` and `(1 + level)/2` of the finite `values`.
pub fn empirical_interval<I: IntoIterator<Item = f64>>(values: I, level: f64) -> EmpiricalInterval {
    let mut discarded = 0;
    let mut kept: Vec<f64> = values
        .into_iter()
        .filter(|v| {
            let ok = v.is_finite();
            discarded += usize::from(!ok);
            ok
        })
        .collect();
    kept.sort_by(f64::total_cmp);
    let bounds = percentile(&kept, (1.0 - level) / 2.0)
        .zip(percentile(&kept, (1.0 + level) / 2.0));
    EmpiricalInterval { bounds, kept: kept.len(), discarded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    // Purpose
    // -------
    // Percentiles interpolate linearly between order statistics.
    fn percentile_is_linear() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), Some(1.0));
        assert_eq!(percentile(&v, 1.0), Some(5.0));
        assert_eq!(percentile(&v, 0.5), Some(3.0));
        assert_relative_eq!(percentile(&v, 0.1).expect("non-empty"), 1.4, epsilon = 1e-12);
        assert_eq!(percentile(&[7.0], 0.975), Some(7.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite values are dropped and counted; an all-NaN sample gives no
    // interval.
    fn empirical_interval_discards_non_finite() {
        let values = (0..=100).map(f64::from).chain([f64::NAN, f64::INFINITY]);
        let iv = empirical_interval(values, 0.9);
        assert_eq!((iv.kept, iv.discarded), (101, 2));
        let (lo, hi) = iv.bounds.expect("finite values");
        assert_relative_eq!(lo, 5.0, epsilon = 1e-12);
        assert_relative_eq!(hi, 95.0, epsilon = 1e-12);

        let none = empirical_interval([f64::NAN; 4], 0.95);
        assert_eq!(none.bounds, None);
        assert_eq!(none.discarded, 4);
    }

    #[test]
    // Purpose
    // -------
    // Draws from a positive-definite covariance match its first two moments.
    //
    // Given
    // -----
    // - μ = (1, -2), Σ = [[2, 0.6], [0.6, 1]], 20 000 seeded draws.
    //
    // Expect
    // ------
    // - Cholesky factorization; sample mean and covariance within Monte
    //   Carlo error.
    fn sampler_reproduces_moments() {
        // Arrange
        let cov = array![[2.0, 0.6], [0.6, 1.0]];
        let sampler = MvnSampler::new(array![1.0, -2.0], &cov).expect("valid inputs");
        let mut rng = StdRng::seed_from_u64(46);
        let n = 20_000;

        // Act
        let draws: Vec<Array1<f64>> = (0..n).map(|_| sampler.sample(&mut rng)).collect();

        // Assert
        assert_eq!(sampler.factorization(), Factorization::Cholesky);
        let mean = draws.iter().fold(Array1::<f64>::zeros(2), |acc, d| acc + d) / n as f64;
        assert_relative_eq!(mean[0], 1.0, epsilon = 0.05);
        assert_relative_eq!(mean[1], -2.0, epsilon = 0.05);
        let mut s = Array2::<f64>::zeros((2, 2));
        for d in &draws {
            let c = d - &mean;
            for i in 0..2 {
                for j in 0..2 {
                    s[[i, j]] += c[i] * c[j] / (n - 1) as f64;
                }
            }
        }
        for ((i, j), &v) in s.indexed_iter() {
            assert_relative_eq!(v, cov[[i, j]], epsilon = 0.08);
        }
    }

    #[test]
    // Purpose
    // -------
    // Semi-definite covariances fall back to the eigen factor; indefinite
    // ones produce NaN draws; shape errors are rejected.
    fn sampler_fallbacks_and_errors() {
        let mut rng = StdRng::seed_from_u64(1);

        let psd = MvnSampler::new(array![0.0, 0.0], &array![[1.0, 1.0], [1.0, 1.0]])
            .expect("valid inputs");
        assert_eq!(psd.factorization(), Factorization::Eigen);
        let d = psd.sample(&mut rng);
        assert!(d.iter().all(|v| v.is_finite()));
        assert_relative_eq!(d[0], d[1], epsilon = 1e-10);

        let indefinite = MvnSampler::new(array![0.0, 0.0], &array![[1.0, 0.0], [0.0, -1.0]])
            .expect("valid inputs");
        assert!(indefinite.sample(&mut rng).iter().any(|v| v.is_nan()));

        assert!(matches!(
            MvnSampler::new(array![0.0], &array![[1.0, 0.0], [0.0, 1.0]]),
            Err(InferenceError::SamplerDimMismatch { mean: 1, rows: 2, cols: 2 })
        ));
        assert!(matches!(
            MvnSampler::new(array![f64::NAN], &array![[1.0]]),
            Err(InferenceError::NonFiniteSamplerInput)
        ));
    }
}
