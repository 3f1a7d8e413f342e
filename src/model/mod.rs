//! model — the household final-size transmission likelihood.
//!
//! Purpose
//! -------
//! Evaluate the probability of each household's observed set of cases under
//! external infection plus within-household transmission, and combine the
//! households into a penalized objective for estimation.
//!
//! Key behaviors
//! -------------
//! - [`params`]: [`ParamLayout`] and the structured [`ModelParams`].
//! - [`ball`]: `phi`, bit decomposition, subset enumeration and the
//!   per-household Ball-matrix solve.
//! - [`likelihood`]: [`HouseholdModel`] (case cap, ridge, optional rayon
//!   map) implementing [`LogLikelihood`](crate::optimization::loglik_optimizer::LogLikelihood).
//! - [`errors`]: [`ModelError`] / [`ModelResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Evaluation never panics on bad parameters; failures are errors from the
//!   fallible path and `+∞` from [`HouseholdModel::objective`].
//!
//! Downstream usage
//! ----------------
//! - The estimator maximizes `-(NLL + ridge)` through the `LogLikelihood`
//!   impl; the uncertainty layer differentiates [`HouseholdModel::objective`].

pub mod ball;
pub mod errors;
pub mod likelihood;
pub mod params;

pub use self::ball::{
    MAX_SUPPORTED_CASES, OrderedHousehold, PHI_THETA_EPS, bit_array_to_decimal,
    decimal_to_bit_array, household_nll, log_phi, phi, submasks,
};
pub use self::errors::{ModelError, ModelResult};
pub use self::likelihood::{DEFAULT_MAX_CASES, HouseholdModel, PreparedHouseholds};
pub use self::params::{ETA_HALF_WIDTH, ModelParams, ParamLayout};

pub mod prelude {
    pub use super::errors::{ModelError, ModelResult};
    pub use super::likelihood::{HouseholdModel, PreparedHouseholds};
    pub use super::params::{ModelParams, ParamLayout};
}
