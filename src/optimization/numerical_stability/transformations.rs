//! Numerical stability utilities.
//!
//! Provides safe implementations of the nonlinear transforms used to move
//! between the optimizer's unconstrained space and the bounded model space.
//! The functions here use explicit cutoffs to keep `f64` arithmetic in a
//! well-conditioned regime, in the same spirit as the guarded transforms
//! found in major ML libraries.
//!
//! # Provided items
//! - [`LOGIT_EPS`]: clamp applied to probabilities before taking a logit,
//!   so a start point sitting exactly on a box bound maps to a large but
//!   finite unconstrained value.
//! - [`EIGEN_EPS`]: relative eigenvalue floor used to call a symmetric
//!   matrix numerically singular.
//! - [`GENERAL_TOL`]: generic small tolerance for comparisons.
//! - [`safe_logistic(x)`]: stable `1 / (1 + exp(-x))`, ℝ → (0, 1).
//! - [`safe_logit(p)`]: inverse of the logistic on a clamped `p`.
//! - [`arctan_squash(x, half_width)`]: monotone map ℝ → (-half_width, half_width).

/// Probability clamp used by [`safe_logit`].
///
/// `logit(LOGIT_EPS) ≈ -27.6`, which keeps the logistic derivative at the
/// start point far from zero in double precision.
pub const LOGIT_EPS: f64 = 1e-12;

/// Relative eigenvalue floor for declaring a symmetric matrix singular.
///
/// A matrix whose smallest absolute eigenvalue is at most
/// `EIGEN_EPS * max|λ|` is treated as numerically singular.
pub const EIGEN_EPS: f64 = 1e-12;

/// Generic small tolerance shared by validation helpers.
pub const GENERAL_TOL: f64 = 1e-10;

/// Numerically stable logistic: `σ(x) = 1 / (1 + exp(-x))`.
///
/// Evaluates the branch that never exponentiates a large positive number:
///
/// - For `x >= 0`, `σ(x) = 1 / (1 + exp(-x))`.
/// - For `x < 0`, `σ(x) = exp(x) / (1 + exp(x))`.
///
/// # Parameters
/// - `x`: real input.
///
/// # Returns
/// - `σ(x)` in `[0, 1]`; values saturate to the endpoints only for
///   `|x|` beyond roughly 745.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Stable inverse logistic `logit(p) = ln(p / (1 - p))`.
///
/// `p` is clamped into `[LOGIT_EPS, 1 - LOGIT_EPS]` first so that the
/// result is always finite. Uses `ln_1p(-p)` for precision near zero.
///
/// # Parameters
/// - `p`: probability-like value; values outside `(0, 1)` are clamped.
///
/// # Returns
/// - `t` with `safe_logistic(t) ≈ p` (exact up to the clamp).
pub fn safe_logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    p.ln() - (-p).ln_1p()
}

/// Bounded monotone squashing `(2·half_width/π)·atan(x)`.
///
/// Maps ℝ onto the open interval `(-half_width, half_width)`. With
/// `half_width = 2` this is the `(4/π)·atan(x)` transform applied to the
/// household-size scaling exponent.
pub fn arctan_squash(x: f64, half_width: f64) -> f64 {
    (2.0 * half_width / std::f64::consts::PI) * x.atan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // The stable logistic agrees with the naive formula on a safe grid and
    // saturates without NaN in the tails.
    fn safe_logistic_matches_naive_and_saturates() {
        for &x in &[-20.0, -3.0, -0.5, 0.0, 0.5, 3.0, 20.0] {
            let naive = 1.0 / (1.0 + f64::exp(-x));
            assert!((safe_logistic(x) - naive).abs() < 1e-15);
        }
        assert_eq!(safe_logistic(1e4), 1.0);
        assert_eq!(safe_logistic(-1e4), 0.0);
        assert!(!safe_logistic(-1e4).is_nan());
    }

    #[test]
    // Purpose
    // -------
    // `safe_logit` inverts `safe_logistic` and stays finite at the
    // endpoints thanks to the clamp.
    fn safe_logit_inverts_logistic_and_is_finite_at_endpoints() {
        for &t in &[-10.0, -1.0, 0.0, 2.5, 10.0] {
            assert!((safe_logit(safe_logistic(t)) - t).abs() < 1e-8);
        }
        assert!(safe_logit(0.0).is_finite());
        assert!(safe_logit(1.0).is_finite());
        assert!(safe_logit(0.0) < -20.0);
        assert!(safe_logit(1.0) > 20.0);
    }

    #[test]
    // Purpose
    // -------
    // With half width 2 the squash reproduces (4/π)·atan and stays inside
    // (-2, 2) for huge inputs.
    fn arctan_squash_is_bounded() {
        let x: f64 = 0.7;
        let expected = 4.0 / std::f64::consts::PI * x.atan();
        assert!((arctan_squash(x, 2.0) - expected).abs() < 1e-15);
        assert!(arctan_squash(1e12, 2.0) < 2.0);
        assert!(arctan_squash(-1e12, 2.0) > -2.0);
        assert_eq!(arctan_squash(0.0, 2.0), 0.0);
    }
}
