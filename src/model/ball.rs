//! Ball-matrix evaluation of one household's final-size probability.
//!
//! Purpose
//! -------
//! Compute the negative log-probability that exactly the observed cases of a
//! household end up infected, under external infection plus within-household
//! transmission with gamma-frailty escape probabilities `phi`.
//!
//! Key behaviors
//! -------------
//! - [`phi`] / [`log_phi`]: `(1 + θ s)^(-1/θ)` with the `θ → 0` limit
//!   `exp(-s)`.
//! - [`decimal_to_bit_array`] / [`bit_array_to_decimal`]: MSB-first bit
//!   decomposition of subset indices.
//! - [`submasks`]: ascending enumeration of the subsets of a subset, which
//!   fills the lower-triangular Ball matrix row by row.
//! - [`household_nll`]: zero-case closed form, or Ball matrix + forward
//!   substitution for households with cases.
//!
//! Invariants & assumptions
//! ------------------------
//! - Members of an [`OrderedHousehold`] are stored non-cases first, then
//!   cases, each group in input order. Bit `b` of a subset index refers to
//!   the `b`-th case.
//! - Row `j` of the Ball matrix only has entries at columns `ω ⊆ j`, and
//!   every such `ω <= j`, so the matrix is lower triangular with a
//!   `2^cases` side.
//! - The contribution is `-ln v[2^cases - 1]` where `BB v = 1`. A
//!   non-finite entry, a singular diagonal or a non-positive solution is a
//!   [`ModelError::NumericalFailure`].
//!
//! Conventions
//! -----------
//! - `laM[i, k] = exp(llaL)·exp(beta·x_i)·exp(gamma·x_k)·m^eta` is rank one,
//!   so the column sums `Σ_{i∉j} laM[i, k]` are formed from the summed
//!   susceptibilities of the escaped members instead of the full matrix.
//! - Entries are assembled in log space and exponentiated once.
//!
//! Testing notes
//! -------------
//! - Closed forms for zero-case, single-case and two-member households are
//!   checked against hand computations.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};

use crate::{
    household::Household,
    model::{
        errors::{ModelError, ModelResult},
        params::ModelParams,
    },
};

/// Below this frailty variance `phi` uses its exponential limit.
pub const PHI_THETA_EPS: f64 = 1e-12;

/// Natural log of [`phi`].
pub fn log_phi(s: f64, log_theta: f64) -> f64 {
    if s == 0.0 {
        return 0.0;
    }
    let theta = log_theta.exp();
    if theta < PHI_THETA_EPS {
        return -s;
    }
    -(theta * s).ln_1p() / theta
}

/// Escape probability `(1 + θ s)^(-1/θ)` with `θ = exp(log_theta)`.
///
/// `phi(0, ·) == 1` exactly, and for `θ < PHI_THETA_EPS` the value is the
/// limit `exp(-s)`.
pub fn phi(s: f64, log_theta: f64) -> f64 {
    log_phi(s, log_theta).exp()
}

/// Largest number of cases [`household_nll`] evaluates. At this size the
/// Ball matrix is `2^20 × 2^20`.
pub const MAX_SUPPORTED_CASES: usize = 20;

/// Low `n` bits of `d`, most significant first.
///
/// Positions at or above `usize::BITS` are zero, so for larger `n` the
/// result is left-padded with zeros.
pub fn decimal_to_bit_array(d: usize, n: usize) -> Vec<u8> {
    (0..n)
        .rev()
        .map(|b| {
            let shifted = u32::try_from(b).ok().and_then(|b| d.checked_shr(b)).unwrap_or(0);
            (shifted & 1) as u8
        })
        .collect()
}

/// Inverse of [`decimal_to_bit_array`].
pub fn bit_array_to_decimal(bits: &[u8]) -> usize {
    bits.iter().fold(0, |acc, &b| (acc << 1) | usize::from(b != 0))
}

/// Ascending iterator over every subset of `mask`, from `0` to `mask`.
#[derive(Debug, Clone)]
pub struct Submasks {
    mask: usize,
    next: Option<usize>,
}

impl Iterator for Submasks {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let cur = self.next?;
        self.next = if cur == self.mask {
            None
        } else {
            Some((cur | !self.mask).wrapping_add(1) & self.mask)
        };
        Some(cur)
    }
}

pub fn submasks(mask: usize) -> Submasks {
    Submasks { mask, next: Some(0) }
}

/// A household with members reordered non-cases first.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedHousehold {
    /// Position of the household in its dataset.
    pub index: usize,
    pub cases: usize,
    pub design: Array2<f64>,
}

impl OrderedHousehold {
    /// Stable partition of `household`'s rows into non-cases then cases.
    pub fn new(index: usize, household: &Household) -> Self {
        let order: Vec<usize> = (0..household.size())
            .filter(|&i| household.outcomes[i] == 0)
            .chain((0..household.size()).filter(|&i| household.outcomes[i] != 0))
            .collect();
        Self {
            index,
            cases: household.cases(),
            design: household.design.select(Axis(0), &order),
        }
    }

    pub fn size(&self) -> usize {
        self.design.nrows()
    }

    fn non_cases(&self) -> usize {
        self.size() - self.cases
    }
}

/// Negative log-probability of the household's observed outcome.
///
/// # Errors
/// - [`ModelError::NumericalFailure`] if the Ball-matrix solve breaks down.
pub fn household_nll(hh: &OrderedHousehold, params: &ModelParams) -> ModelResult<f64> {
    let external: Array1<f64> = hh.design.dot(&params.alpha).mapv(f64::exp);
    let rate_g = params.lla_g.exp();
    if hh.cases == 0 {
        return Ok(rate_g * external.sum());
    }

    let fail = |reason: String| ModelError::NumericalFailure { household: hh.index, reason };

    // -ln Bk_i
    let hazard = external * rate_g;
    let susceptibility = hh.design.dot(&params.beta).mapv(f64::exp);
    let transmissibility = hh.design.dot(&params.gamma).mapv(f64::exp);
    let scale = params.lla_l.exp() * (hh.size() as f64).powf(params.eta());

    let nc = hh.non_cases();
    let q = hh.cases;
    if q > MAX_SUPPORTED_CASES {
        return Err(fail(format!("{q} cases exceed the supported {MAX_SUPPORTED_CASES}")));
    }
    let r = 1usize << q;
    let base_hazard: f64 = hazard.slice(ndarray::s![..nc]).sum();
    let base_susc: f64 = susceptibility.slice(ndarray::s![..nc]).sum();

    let mut bb = DMatrix::<f64>::zeros(r, r);
    let mut ln_phi = vec![0.0; q];
    for j in 0..r {
        let mut escape_hazard = base_hazard;
        let mut escaped_susc = base_susc;
        for b in (0..q).filter(|b| j & (1 << b) == 0) {
            escape_hazard += hazard[nc + b];
            escaped_susc += susceptibility[nc + b];
        }
        for b in (0..q).filter(|b| j & (1 << b) != 0) {
            ln_phi[b] = log_phi(scale * transmissibility[nc + b] * escaped_susc, params.log_theta);
        }
        for om in submasks(j) {
            let ln_escape: f64 = (0..q).filter(|b| om & (1 << b) != 0).map(|b| ln_phi[b]).sum();
            let entry = (escape_hazard - ln_escape).exp();
            if !entry.is_finite() {
                return Err(fail(format!("Ball matrix entry ({j}, {om}) is {entry}")));
            }
            bb[(j, om)] = entry;
        }
    }

    let v = bb
        .solve_lower_triangular(&DVector::from_element(r, 1.0))
        .ok_or_else(|| fail("Ball matrix is singular".to_string()))?;
    let p_all = v[r - 1];
    if !(p_all.is_finite() && p_all > 0.0) {
        return Err(fail(format!("final-size probability is {p_all}")));
    }
    Ok(-p_all.ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn params(lla_l: f64, lla_g: f64, log_theta: f64, n_age: usize) -> ModelParams {
        ModelParams {
            lla_l,
            lla_g,
            log_theta,
            eta_raw: None,
            alpha: Array1::zeros(n_age),
            beta: Array1::zeros(n_age),
            gamma: Array1::zeros(n_age),
        }
    }

    fn household(outcomes: Vec<u8>, design: Array2<f64>) -> OrderedHousehold {
        OrderedHousehold::new(0, &Household { id: "h".into(), outcomes, design })
    }

    #[test]
    // Purpose
    // -------
    // `phi` is exactly one at zero pressure, matches the closed form, and
    // reaches `exp(-s)` as the frailty variance vanishes.
    fn phi_values_and_limit() {
        assert_eq!(phi(0.0, 3.0), 1.0);
        assert_eq!(phi(0.0, -50.0), 1.0);
        assert_relative_eq!(phi(2.0, 0.0), 1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(phi(0.7, -40.0), (-0.7f64).exp(), epsilon = 1e-14);
        assert_relative_eq!(phi(0.7, -20.0), (-0.7f64).exp(), epsilon = 1e-8);
    }

    #[test]
    // Purpose
    // -------
    // Bit decomposition round-trips and subsets come out ascending.
    fn bits_and_submasks() {
        assert_eq!(decimal_to_bit_array(6, 4), vec![0, 1, 1, 0]);
        assert_eq!(decimal_to_bit_array(5, 2), vec![0, 1]);
        for d in 0..32 {
            assert_eq!(bit_array_to_decimal(&decimal_to_bit_array(d, 5)), d);
        }
        assert_eq!(submasks(0b101).collect::<Vec<_>>(), vec![0, 1, 4, 5]);
        assert_eq!(submasks(0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(submasks(0b111).count(), 8);
    }

    #[test]
    // Purpose
    // -------
    // Asking for more bits than `usize` holds pads with leading zeros.
    //
    // Given
    // -----
    // - d = 5 decomposed into 70 bits, and `usize::MAX` into `usize::BITS + 2`.
    //
    // Expect
    // ------
    // - Lengths as requested; only the low bits are set.
    fn wide_bit_arrays_pad_with_zeros() {
        // Arrange
        let width = usize::BITS as usize;

        // Act
        let five = decimal_to_bit_array(5, 70);
        let full = decimal_to_bit_array(usize::MAX, width + 2);

        // Assert
        assert_eq!(five.len(), 70);
        assert_eq!(&five[67..], &[1, 0, 1]);
        assert!(five[..67].iter().all(|&b| b == 0));
        assert_eq!(&full[..2], &[0, 0]);
        assert!(full[2..].iter().all(|&b| b == 1));
        assert_eq!(bit_array_to_decimal(&five), 5);
    }

    #[test]
    // Purpose
    // -------
    // A household without cases contributes `exp(llaG)·Σ exp(alpha·x_i)`.
    //
    // Given
    // -----
    // - Three members in bands (0-9), (10-18), reference; alpha = (0.5, -0.3).
    //
    // Expect
    // ------
    // - `e^{-1}(e^{0.5} + e^{-0.3} + 1)`.
    fn zero_case_household_closed_form() {
        // Arrange
        let hh = household(vec![0, 0, 0], array![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]);
        let mut p = params(-1.5, -1.0, 0.0, 2);
        p.alpha = array![0.5, -0.3];

        // Act
        let nll = household_nll(&hh, &p).expect("closed form");

        // Assert
        let expected = (-1.0f64).exp() * (0.5f64.exp() + (-0.3f64).exp() + 1.0);
        assert_relative_eq!(nll, expected, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Single-case and two-member households match their hand-derived
    // probabilities.
    //
    // Given
    // -----
    // - A lone case: `P = 1 - Bk`.
    // - A case listed before a non-case: `P = (1 - Bk_c)·Bk_n·phi(laM[n, c])`.
    //
    // Expect
    // ------
    // - `household_nll == -ln P` in both cases; input order does not matter.
    fn small_households_match_hand_computation() {
        // Arrange
        let lone = household(vec![1], array![[0.0]]);
        let pair = household(vec![1, 0], array![[1.0], [0.0]]);
        let mut p = params(-0.5, -1.2, 0.3, 1);
        p.alpha = array![0.4];
        p.beta = array![-0.2];
        p.gamma = array![0.7];

        // Act
        let lone_nll = household_nll(&lone, &p).expect("solvable");
        let pair_nll = household_nll(&pair, &p).expect("solvable");

        // Assert
        let rate_g = (-1.2f64).exp();
        let bk_ref = (-rate_g).exp();
        assert_relative_eq!(lone_nll, -(1.0 - bk_ref).ln(), epsilon = 1e-12);

        let bk_case = (-rate_g * 0.4f64.exp()).exp();
        let la = (-0.5f64).exp() * 1.0 * 0.7f64.exp();
        let expected = (1.0 - bk_case) * bk_ref * phi(la, 0.3);
        assert_relative_eq!(pair_nll, -expected.ln(), epsilon = 1e-12);
        assert_eq!(pair.design, array![[0.0], [1.0]]);
    }

    #[test]
    // Purpose
    // -------
    // The final-size probabilities of a household sum to one over every
    // possible case set, so each solve is a proper distribution.
    fn outcome_probabilities_sum_to_one() {
        let design = array![[1.0], [0.0], [0.0]];
        let mut p = params(-0.8, -1.5, -0.5, 1);
        p.eta_raw = Some(0.4);
        p.alpha = array![0.3];
        p.beta = array![0.2];
        p.gamma = array![-0.1];

        let mut total = 0.0;
        for mask in 0..8usize {
            let outcomes = decimal_to_bit_array(mask, 3);
            let hh = household(outcomes, design.clone());
            total += (-household_nll(&hh, &p).expect("solvable")).exp();
        }
        assert_relative_eq!(total, 1.0, epsilon = 1e-10);
    }
}
