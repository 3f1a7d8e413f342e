//! loglik_optimizer::bounds — box constraints via a logistic reparameterization.
//!
//! Purpose
//! -------
//! Let unconstrained solvers respect per-parameter box constraints exactly.
//! The solver works on `θ ∈ ℝⁿ`; the model sees
//! `x_i = lo_i + (hi_i - lo_i)·σ(θ_i)`, which lies in `[lo_i, hi_i]` for
//! every `θ`.
//!
//! Key behaviors
//! -------------
//! - [`Bounds`] validates and stores the box, maps between spaces
//!   ([`Bounds::to_model`], [`Bounds::to_unconstrained`]) and draws uniform
//!   points inside it ([`Bounds::sample_uniform`]).
//! - [`BoxConstrained`] wraps any [`LogLikelihood`] defined in model space
//!   and exposes it in `θ` space, so it can be passed straight to
//!   [`maximize`](super::maximize).
//!
//! Invariants & assumptions
//! ------------------------
//! - `lower.len() == upper.len()`, every pair finite with `lower < upper`.
//! - Start points exactly on a bound map to a large but finite `θ`
//!   (see [`LOGIT_EPS`](crate::optimization::numerical_stability::LOGIT_EPS)).
//!
//! Testing notes
//! -------------
//! - Unit tests cover the round trip between spaces, containment of
//!   extreme `θ`, seeded sampling, and the wrapper's delegation.
use ndarray::{Array1, Zip};
use rand::Rng;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Cost, Theta,
        traits::LogLikelihood,
        validation::{validate_bounds, validate_start},
    },
    numerical_stability::transformations::{safe_logistic, safe_logit},
};

/// Validated per-parameter box `[lower_i, upper_i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// # Errors
    /// - `OptError::BoundsDimMismatch` / `OptError::InvalidBounds` from
    ///   [`validate_bounds`].
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> OptResult<Self> {
        validate_bounds(&lower, &upper)?;
        Ok(Self { lower, upper })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Map an unconstrained `θ` into the box.
    pub fn to_model(&self, theta: &Theta) -> Theta {
        Zip::from(theta)
            .and(&self.lower)
            .and(&self.upper)
            .map_collect(|&t, &lo, &hi| (lo + (hi - lo) * safe_logistic(t)).clamp(lo, hi))
    }

    /// Map a point of the box back to `θ` space.
    ///
    /// # Errors
    /// - `OptError::StartDimMismatch` / `OptError::StartOutOfBounds` if `x`
    ///   does not lie in the box.
    pub fn to_unconstrained(&self, x: &Theta) -> OptResult<Theta> {
        validate_start(x, &self.lower, &self.upper)?;
        Ok(Zip::from(x)
            .and(&self.lower)
            .and(&self.upper)
            .map_collect(|&v, &lo, &hi| safe_logit((v - lo) / (hi - lo))))
    }

    pub fn contains(&self, x: &Theta) -> bool {
        validate_start(x, &self.lower, &self.upper).is_ok()
    }

    /// Draw a point uniformly from the box.
    pub fn sample_uniform<R: Rng>(&self, rng: &mut R) -> Theta {
        Zip::from(&self.lower).and(&self.upper).map_collect(|&lo, &hi| rng.gen_range(lo..hi))
    }
}

/// A model-space log-likelihood viewed through a [`Bounds`] transform.
///
/// `value(θ) = inner.value(bounds.to_model(θ))`. Gradients are left to the
/// finite-difference fallback, which differentiates in `θ` space.
#[derive(Debug, Clone, Copy)]
pub struct BoxConstrained<'a, F: LogLikelihood> {
    pub inner: &'a F,
    pub bounds: &'a Bounds,
}

impl<'a, F: LogLikelihood> BoxConstrained<'a, F> {
    pub fn new(inner: &'a F, bounds: &'a Bounds) -> Self {
        Self { inner, bounds }
    }
}

impl<'a, F: LogLikelihood> LogLikelihood for BoxConstrained<'a, F> {
    type Data = F::Data;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        self.inner.value(&self.bounds.to_model(theta), data)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        self.inner.check(&self.bounds.to_model(theta), data)
    }
}
