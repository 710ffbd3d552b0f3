//! Monte Carlo simulation of a cross-section of households following a policy.

use log::debug;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, WeightedAliasIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AiyagariError, Result};
use crate::grid::StateSpace;

/// Size, length, and seed of a simulated panel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelOptions {
    /// Number of simulated households.
    pub households: usize,
    /// Number of periods each household is simulated for.
    pub periods: usize,
    /// Base seed; household `i` uses `seed + i`.
    pub seed: u64,
    /// Asset grid index every household starts from.
    pub initial_asset: usize,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            households: 2_000,
            periods: 500,
            seed: 0,
            initial_asset: 0,
        }
    }
}

/// Final cross-section of a simulated panel.
#[derive(Clone, Debug, Serialize)]
pub struct PanelSummary {
    /// Asset holdings of every household in the last period.
    pub final_assets: Vec<f64>,
    /// Cross-sectional mean of `final_assets`.
    pub mean_assets: f64,
}

/// Simulates households that choose next-period assets by `policy`.
///
/// Initial shocks are drawn from the stationary distribution of the shock
/// chain. Each household has its own generator, so the result does not
/// depend on how work is split across threads.
pub fn simulate_panel(
    space: &StateSpace,
    policy: &[usize],
    options: &PanelOptions,
) -> Result<PanelSummary> {
    if policy.len() != space.state_count() {
        return Err(AiyagariError::dimension_mismatch(
            "policy length",
            space.state_count(),
            policy.len(),
        ));
    }
    if options.initial_asset >= space.asset_count() {
        return Err(AiyagariError::dimension_mismatch(
            "initial asset index",
            space.asset_count(),
            options.initial_asset,
        ));
    }
    if let Some(action) = policy.iter().copied().find(|&a| a >= space.asset_count()) {
        return Err(AiyagariError::dimension_mismatch(
            "policy action index bound",
            space.asset_count(),
            action,
        ));
    }
    if options.households == 0 {
        return Err(AiyagariError::dimension_mismatch("panel households", 1, 0));
    }

    let chain = space.chain();
    let samplers = chain.samplers()?;
    let initial = WeightedAliasIndex::new(chain.stationary_distribution()?.iter().copied().collect())
        .map_err(|_| AiyagariError::NumericalError {
            context: "initial shock sampler construction",
        })?;
    let grid = space.grid();

    let final_assets: Vec<f64> = (0..options.households)
        .into_par_iter()
        .map(|household| {
            let mut rng = SmallRng::seed_from_u64(options.seed.wrapping_add(household as u64));
            let mut asset = options.initial_asset;
            let mut shock = initial.sample(&mut rng);
            for _ in 0..options.periods {
                asset = policy[space.encode(asset, shock)];
                shock = samplers[shock].sample(&mut rng);
            }
            grid.value(asset)
        })
        .collect();

    let mean_assets = final_assets.iter().sum::<f64>() / final_assets.len() as f64;
    debug!(
        "simulated {} households for {} periods: mean assets {mean_assets}",
        options.households, options.periods
    );
    Ok(PanelSummary {
        final_assets,
        mean_assets,
    })
}
