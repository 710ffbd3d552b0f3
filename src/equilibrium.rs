//! Capital market clearing: aggregate household assets against firm capital demand.

use log::{debug, info};
use nalgebra::DVector;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{AiyagariError, Result};
use crate::firm::FirmParams;
use crate::grid::StateSpace;
use crate::household::{Household, SteadyState};
use crate::options::ModelOptions;
use crate::root::{find_root, RootResult};

/// Expected asset holdings under `distribution`.
pub fn aggregate_capital(space: &StateSpace, distribution: &DVector<f64>) -> Result<f64> {
    check_distribution(space, distribution)?;
    Ok(space.values().column(0).dot(distribution))
}

/// Marginal distribution over the asset grid, summing out the shock.
pub fn asset_marginal(space: &StateSpace, distribution: &DVector<f64>) -> Result<DVector<f64>> {
    check_distribution(space, distribution)?;
    let mut marginal = DVector::zeros(space.asset_count());
    for (state, probability) in distribution.iter().enumerate() {
        marginal[space.decode(state).asset] += probability;
    }
    Ok(marginal)
}

fn check_distribution(space: &StateSpace, distribution: &DVector<f64>) -> Result<()> {
    if distribution.len() != space.state_count() {
        return Err(AiyagariError::dimension_mismatch(
            "distribution length",
            space.state_count(),
            distribution.len(),
        ));
    }
    Ok(())
}

/// Household block and firm, the two sides of the capital market.
#[derive(Clone, Debug)]
pub struct AiyagariModel {
    household: Household,
    firm: FirmParams,
}

impl AiyagariModel {
    /// Pairs a household block with a validated firm.
    pub fn new(household: Household, firm: FirmParams) -> Result<Self> {
        firm.validate()?;
        Ok(Self { household, firm })
    }

    /// Builds the household and firm described by `options`.
    pub fn from_options(options: &ModelOptions) -> Result<Self> {
        let household = Household::from_config(&options.household)?;
        Self::new(household, options.firm.clone())
    }

    /// Accessor for the household block.
    pub fn household(&self) -> &Household {
        &self.household
    }

    /// Accessor for the firm.
    pub fn firm(&self) -> &FirmParams {
        &self.firm
    }

    /// Household steady state at `r` and the wage the firm pays at `r`.
    pub fn capital_supply(&self, r: f64, options: &ModelOptions) -> Result<SteadyState> {
        let prices = self.firm.prices(r)?;
        self.household
            .steady_state(prices, &options.dp, &options.stationary)
    }

    /// Capital supply minus capital demand at `r`.
    pub fn excess_supply(&self, r: f64, options: &ModelOptions) -> Result<f64> {
        let supply = self.capital_supply(r, options)?.capital;
        let demand = self.firm.capital_demand(r)?;
        debug!("r = {r}: supply {supply}, demand {demand}");
        Ok(supply - demand)
    }

    /// Finds the interest rate that clears the capital market.
    ///
    /// Capital supply is piecewise constant in `r` on a discrete grid, so the
    /// excess supply may jump across zero; the returned bracket and its end
    /// residuals describe how close the market comes to clearing.
    pub fn solve_equilibrium(&self, options: &ModelOptions) -> Result<Equilibrium> {
        let bracket = &options.equilibrium;
        let root = find_root(
            |r| self.excess_supply(r, options),
            bracket.r_lower,
            bracket.r_upper,
            &bracket.root,
        )?;

        let steady_state = self.capital_supply(root.root, options)?;
        let capital_demand = self.firm.capital_demand(root.root)?;
        let equilibrium = Equilibrium {
            r: root.root,
            w: steady_state.prices.w,
            capital_supply: steady_state.capital,
            capital_demand,
            residual: steady_state.capital - capital_demand,
            output: self.firm.output(steady_state.capital),
            root,
            steady_state,
        };
        info!(
            "equilibrium r = {:.6}, w = {:.6}, K = {:.6} after {} root iterations",
            equilibrium.r, equilibrium.w, equilibrium.capital_supply, equilibrium.root.iterations
        );
        Ok(equilibrium)
    }

    /// Capital supply and demand on a grid of interest rates, evaluated in parallel.
    pub fn supply_demand_curves(
        &self,
        rates: &[f64],
        options: &ModelOptions,
    ) -> Result<Vec<CurvePoint>> {
        rates
            .par_iter()
            .map(|&r| -> Result<CurvePoint> {
                Ok(CurvePoint {
                    r,
                    capital_supply: self.capital_supply(r, options)?.capital,
                    capital_demand: self.firm.capital_demand(r)?,
                })
            })
            .collect()
    }
}

/// Interest rate with household and firm capital at that rate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub r: f64,
    pub capital_supply: f64,
    pub capital_demand: f64,
}

/// Outcome of the equilibrium search.
#[derive(Clone, Debug, Serialize)]
pub struct Equilibrium {
    /// Equilibrium interest rate.
    pub r: f64,
    /// Wage implied by `r`.
    pub w: f64,
    pub capital_supply: f64,
    pub capital_demand: f64,
    /// `capital_supply - capital_demand` at `r`.
    pub residual: f64,
    /// Output produced with the household capital stock.
    pub output: f64,
    /// Root-finder diagnostics and final bracket.
    pub root: RootResult,
    /// Household policy and distribution at `r`.
    pub steady_state: SteadyState,
}
