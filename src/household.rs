//! The household problem: state space, reward and transition arrays, and its steady state.

use log::debug;
use nalgebra::DVector;
use serde::Serialize;

use crate::arrays::{RewardArray, TransitionArray};
use crate::ddp::{DiscreteDp, DpSolution};
use crate::equilibrium::aggregate_capital;
use crate::error::{AiyagariError, Result};
use crate::firm::Prices;
use crate::grid::{AssetGrid, StateSpace};
use crate::options::HouseholdConfig;
use crate::solving::{DpOptions, StationaryOptions, StationarySummary};
use crate::stationary::stationary_distribution;
use crate::utility::Utility;

/// Households facing prices `(r, w)` and idiosyncratic shocks.
///
/// The transition array depends only on the grid and the shock chain, so it
/// is built once here and only ever borrowed immutably. The reward array is a
/// reusable buffer refilled by [`Household::set_prices`]; steady-state
/// evaluations at other prices build their own reward array instead.
#[derive(Clone, Debug)]
pub struct Household {
    space: StateSpace,
    utility: Utility,
    beta: f64,
    prices: Prices,
    reward: RewardArray,
    transition: TransitionArray,
}

impl Household {
    /// Builds the household and its arrays at the given prices.
    pub fn new(space: StateSpace, utility: Utility, beta: f64, prices: Prices) -> Result<Self> {
        utility.validate()?;
        if !(0.0..1.0).contains(&beta) {
            return Err(AiyagariError::invalid_parameter(
                "beta",
                beta,
                "discount factor must lie in [0, 1)",
            ));
        }
        let transition = TransitionArray::build(&space);
        let reward = RewardArray::build(&space, &utility, prices)?;
        debug!(
            "household with {} states ({} assets x {} shocks)",
            space.state_count(),
            space.asset_count(),
            space.shock_count()
        );
        Ok(Self {
            space,
            utility,
            beta,
            prices,
            reward,
            transition,
        })
    }

    /// Builds the household from a configuration object.
    pub fn from_config(config: &HouseholdConfig) -> Result<Self> {
        config.validate()?;
        let chain = config.shocks.build()?;
        let grid = AssetGrid::linspace(config.a_min, config.a_max, config.a_size)?;
        let space = StateSpace::new(grid, chain)?;
        Self::new(
            space,
            config.utility,
            config.beta,
            Prices {
                r: config.r,
                w: config.w,
            },
        )
    }

    /// Refills the stored reward array for new prices. The transition array is untouched.
    pub fn set_prices(&mut self, prices: Prices) -> Result<()> {
        self.reward.refill(&self.space, &self.utility, prices)?;
        self.prices = prices;
        Ok(())
    }

    /// Current prices of the stored reward array.
    pub fn prices(&self) -> Prices {
        self.prices
    }

    /// Accessor for the state space.
    pub fn space(&self) -> &StateSpace {
        &self.space
    }

    /// Accessor for the period utility.
    pub fn utility(&self) -> &Utility {
        &self.utility
    }

    /// Discount factor.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Reward array at the current prices.
    pub fn reward(&self) -> &RewardArray {
        &self.reward
    }

    /// Price-independent transition array.
    pub fn transition(&self) -> &TransitionArray {
        &self.transition
    }

    /// Solves the dynamic program at the current prices.
    pub fn solve(&self, options: &DpOptions) -> Result<DpSolution> {
        DiscreteDp::new(&self.reward, &self.transition, self.beta)?.solve(options)
    }

    /// Solves the dynamic program at `prices` without touching the stored reward array.
    pub fn solve_at(&self, prices: Prices, options: &DpOptions) -> Result<DpSolution> {
        let reward = RewardArray::build(&self.space, &self.utility, prices)?;
        DiscreteDp::new(&reward, &self.transition, self.beta)?.solve(options)
    }

    /// Policy, stationary distribution, and aggregate assets at `prices`.
    pub fn steady_state(
        &self,
        prices: Prices,
        dp: &DpOptions,
        stationary: &StationaryOptions,
    ) -> Result<SteadyState> {
        let solution = self.solve_at(prices, dp)?;
        let (distribution, stationary_summary) =
            stationary_distribution(&solution.transition, stationary)?;
        let capital = aggregate_capital(&self.space, &distribution)?;
        debug!(
            "steady state at r = {}, w = {}: capital {capital}",
            prices.r, prices.w
        );
        Ok(SteadyState {
            prices,
            solution,
            distribution,
            stationary: stationary_summary,
            capital,
        })
    }

    /// Next-period asset holdings chosen in every state.
    pub fn asset_policy(&self, solution: &DpSolution) -> DVector<f64> {
        let grid = self.space.grid();
        DVector::from_fn(self.space.state_count(), |state, _| {
            grid.value(solution.policy[state])
        })
    }

    /// Consumption in every state implied by the policy at `prices`.
    pub fn consumption(&self, solution: &DpSolution, prices: Prices) -> DVector<f64> {
        let grid = self.space.grid();
        DVector::from_fn(self.space.state_count(), |state, _| {
            prices.w * self.space.shock_value(state)
                + (1.0 + prices.r) * self.space.asset_value(state)
                - grid.value(solution.policy[state])
        })
    }
}

/// Household block evaluated at fixed prices.
#[derive(Clone, Debug, Serialize)]
pub struct SteadyState {
    pub prices: Prices,
    pub solution: DpSolution,
    /// Stationary distribution over states.
    pub distribution: DVector<f64>,
    pub stationary: StationarySummary,
    /// Aggregate asset holdings, the household supply of capital.
    pub capital: f64,
}
