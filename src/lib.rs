//! Heterogeneous-agent general equilibrium in the style of Aiyagari (1994).
//!
//! Households face uninsurable idiosyncratic income risk, described by a
//! finite Markov chain, and choose next-period assets from a discrete grid.
//! A competitive Cobb-Douglas firm rents capital and labour. The crate offers
//! tools to
//!
//! - discretise the household state space (`markov` and `grid` modules),
//! - build the reward and transition arrays of the household problem (`arrays`),
//! - solve discounted discrete dynamic programs (`ddp`),
//! - compute stationary distributions of finite chains (`stationary`), and
//! - clear the capital market by a bracketing root search over the interest
//!   rate (`equilibrium`).
//!
//! # Quick start
//!
//! ```no_run
//! use aiyagari::{AiyagariModel, ModelOptions};
//!
//! // Log utility, beta = 0.96, two-state income chain, 200-point asset grid on
//! // [0, 20], and A = 1, N = 1, alpha = 0.33, delta = 0.05.
//! let options = ModelOptions::default();
//! let model = AiyagariModel::from_options(&options).expect("valid calibration");
//!
//! let equilibrium = model.solve_equilibrium(&options).expect("bracket holds a root");
//! println!(
//!     "r* = {:.4}, w* = {:.4}, K* = {:.4}",
//!     equilibrium.r, equilibrium.w, equilibrium.capital_supply
//! );
//! ```
//!
//! The transition array is built once per household and reused for every
//! interest rate the root finder visits; only the reward array is rebuilt.

pub mod arrays;
pub mod ddp;
pub mod equilibrium;
pub mod error;
pub mod firm;
pub mod grid;
pub mod household;
pub mod markov;
pub mod options;
pub mod root;
pub mod simulation;
pub mod solving;
pub mod stationary;
pub mod utility;

pub use equilibrium::{AiyagariModel, CurvePoint, Equilibrium};
pub use error::{AiyagariError, ErrorKind, Result};
pub use firm::{FirmParams, Prices};
pub use household::{Household, SteadyState};
pub use options::{EquilibriumOptions, HouseholdConfig, ModelOptions, ShockSpec};
pub use solving::{DpMethod, DpOptions, StationaryMethod, StationaryOptions};
pub use utility::Utility;
