//! Configuration structures for households, firms, and the equilibrium search.
//!
//! Every struct has a `Default` matching the textbook calibration and derives
//! `serde` traits with `#[serde(default)]`, so partial JSON documents fill in
//! the remaining fields.

use serde::{Deserialize, Serialize};

use crate::error::{AiyagariError, Result};
use crate::firm::FirmParams;
use crate::markov::ShockChain;
use crate::root::{RootMethod, RootOptions};
use crate::solving::{DpOptions, StationaryOptions};
use crate::utility::Utility;

/// Description of the income shock process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShockSpec {
    /// Explicit state values and transition rows.
    Explicit {
        values: Vec<f64>,
        transition: Vec<Vec<f64>>,
    },
    /// Rouwenhorst discretisation of an AR(1) process.
    Rouwenhorst {
        states: usize,
        rho: f64,
        sigma: f64,
        mean: f64,
    },
}

impl Default for ShockSpec {
    fn default() -> Self {
        ShockSpec::Explicit {
            values: vec![0.1, 1.0],
            transition: vec![vec![0.9, 0.1], vec![0.1, 0.9]],
        }
    }
}

impl ShockSpec {
    /// Builds and validates the chain.
    pub fn build(&self) -> Result<ShockChain> {
        match self {
            ShockSpec::Explicit { values, transition } => {
                ShockChain::from_rows(values.clone(), transition)
            }
            ShockSpec::Rouwenhorst {
                states,
                rho,
                sigma,
                mean,
            } => ShockChain::rouwenhorst(*states, *rho, *sigma, *mean),
        }
    }
}

/// Household preferences, initial prices, shock process, and asset grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdConfig {
    /// Interest rate used for the initial reward array.
    pub r: f64,
    /// Wage used for the initial reward array.
    pub w: f64,
    pub utility: Utility,
    /// Discount factor, in `[0, 1)`.
    pub beta: f64,
    pub shocks: ShockSpec,
    pub a_min: f64,
    pub a_max: f64,
    /// Number of asset grid points, at least 2.
    pub a_size: usize,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            r: 0.01,
            w: 1.0,
            utility: Utility::Log,
            beta: 0.96,
            shocks: ShockSpec::default(),
            a_min: 1e-10,
            a_max: 20.0,
            a_size: 200,
        }
    }
}

impl HouseholdConfig {
    /// Overrides the asset grid.
    pub fn with_grid(mut self, a_min: f64, a_max: f64, a_size: usize) -> Self {
        self.a_min = a_min;
        self.a_max = a_max;
        self.a_size = a_size;
        self
    }

    /// Overrides the shock process.
    pub fn with_shocks(mut self, shocks: ShockSpec) -> Self {
        self.shocks = shocks;
        self
    }

    /// Overrides the utility function.
    pub fn with_utility(mut self, utility: Utility) -> Self {
        self.utility = utility;
        self
    }

    /// Overrides the discount factor.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Checks scalar parameters that do not need the grid or chain to be built.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.beta) {
            return Err(AiyagariError::invalid_parameter(
                "beta",
                self.beta,
                "discount factor must lie in [0, 1)",
            ));
        }
        self.utility.validate()
    }
}

/// Interest-rate bracket and root-finder settings for the equilibrium search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EquilibriumOptions {
    /// Lower end of the interest-rate bracket.
    pub r_lower: f64,
    /// Upper end of the interest-rate bracket.
    pub r_upper: f64,
    pub root: RootOptions,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self {
            r_lower: 0.005,
            r_upper: 0.04,
            root: RootOptions::default(),
        }
    }
}

/// Aggregated configuration of a model and its solvers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub household: HouseholdConfig,
    pub firm: FirmParams,
    pub equilibrium: EquilibriumOptions,
    /// Household dynamic program solver.
    pub dp: DpOptions,
    /// Stationary distribution solver.
    pub stationary: StationaryOptions,
}

impl ModelOptions {
    /// Override the household configuration while preserving other defaults.
    pub fn with_household(mut self, household: HouseholdConfig) -> Self {
        self.household = household;
        self
    }

    /// Override the firm parameters.
    pub fn with_firm(mut self, firm: FirmParams) -> Self {
        self.firm = firm;
        self
    }

    /// Set the interest-rate bracket searched for the equilibrium.
    pub fn with_bracket(mut self, r_lower: f64, r_upper: f64) -> Self {
        self.equilibrium.r_lower = r_lower;
        self.equilibrium.r_upper = r_upper;
        self
    }

    /// Set the bracket-width tolerance of the equilibrium search.
    pub fn with_tolerance(mut self, xtol: f64) -> Self {
        self.equilibrium.root.xtol = xtol;
        self
    }

    /// Choose the root-finding algorithm.
    pub fn with_root_method(mut self, method: RootMethod) -> Self {
        self.equilibrium.root.method = method;
        self
    }

    /// Override the dynamic program solver settings.
    pub fn with_dp(mut self, dp: DpOptions) -> Self {
        self.dp = dp;
        self
    }

    /// Override the stationary distribution solver settings.
    pub fn with_stationary(mut self, stationary: StationaryOptions) -> Self {
        self.stationary = stationary;
        self
    }
}
