//! Finite Markov chains for the idiosyncratic income shock.

use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, WeightedAliasIndex};
use serde::Serialize;

use crate::error::{AiyagariError, Result};
use crate::solving::StationaryOptions;
use crate::stationary::stationary_distribution;

/// Maximum slack allowed when checking that a transition row sums to one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-8;

/// A finite-state Markov chain over productivity values `z`.
#[derive(Clone, Debug, Serialize)]
pub struct ShockChain {
    values: DVector<f64>,
    transition: DMatrix<f64>,
}

impl ShockChain {
    /// Builds a chain from state values and a row-stochastic transition matrix.
    pub fn new(values: DVector<f64>, transition: DMatrix<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(AiyagariError::EmptyShockChain);
        }
        let n = values.len();
        if transition.nrows() != n {
            return Err(AiyagariError::dimension_mismatch(
                "shock transition rows",
                n,
                transition.nrows(),
            ));
        }
        if let Some(value) = values.iter().find(|value| !value.is_finite()) {
            return Err(AiyagariError::invalid_parameter(
                "shock value",
                *value,
                "shock values must be finite",
            ));
        }
        validate_stochastic(&transition)?;

        Ok(Self { values, transition })
    }

    /// Builds a chain from plain vectors, as found in configuration files.
    pub fn from_rows(values: Vec<f64>, rows: &[Vec<f64>]) -> Result<Self> {
        let n = values.len();
        if rows.len() != n {
            return Err(AiyagariError::dimension_mismatch(
                "shock transition rows",
                n,
                rows.len(),
            ));
        }
        let mut entries = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(AiyagariError::dimension_mismatch(
                    "shock transition columns",
                    n,
                    row.len(),
                ));
            }
            entries.extend_from_slice(row);
        }
        Self::new(
            DVector::from_vec(values),
            DMatrix::from_row_slice(n, n, &entries),
        )
    }

    /// Two-state chain that stays in its current state with probability `persistence`.
    pub fn symmetric_two_state(low: f64, high: f64, persistence: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&persistence) {
            return Err(AiyagariError::invalid_parameter(
                "persistence",
                persistence,
                "must lie in [0, 1]",
            ));
        }
        let leave = 1.0 - persistence;
        Self::new(
            DVector::from_vec(vec![low, high]),
            DMatrix::from_row_slice(2, 2, &[persistence, leave, leave, persistence]),
        )
    }

    /// Rouwenhorst discretisation of `z' = (1 - rho) mean + rho z + sigma eps`.
    ///
    /// The grid is evenly spaced around `mean` with half-width
    /// `sigma * sqrt((n - 1) / (1 - rho^2))`, which reproduces the unconditional
    /// variance and first-order autocorrelation of the continuous process exactly.
    pub fn rouwenhorst(states: usize, rho: f64, sigma: f64, mean: f64) -> Result<Self> {
        if states == 0 {
            return Err(AiyagariError::EmptyShockChain);
        }
        if !(rho.abs() < 1.0) {
            return Err(AiyagariError::invalid_parameter(
                "rho",
                rho,
                "must satisfy |rho| < 1",
            ));
        }
        if !(sigma >= 0.0) || !sigma.is_finite() {
            return Err(AiyagariError::invalid_parameter(
                "sigma",
                sigma,
                "must be finite and non-negative",
            ));
        }
        if states == 1 {
            return Self::new(DVector::from_element(1, mean), DMatrix::from_element(1, 1, 1.0));
        }

        let p = (1.0 + rho) / 2.0;
        let q = p;
        let mut theta = DMatrix::from_row_slice(2, 2, &[p, 1.0 - p, 1.0 - q, q]);
        for size in 3..=states {
            let mut next = DMatrix::zeros(size, size);
            let inner = size - 1;
            for i in 0..inner {
                for j in 0..inner {
                    let t = theta[(i, j)];
                    next[(i, j)] += p * t;
                    next[(i, j + 1)] += (1.0 - p) * t;
                    next[(i + 1, j)] += (1.0 - q) * t;
                    next[(i + 1, j + 1)] += q * t;
                }
            }
            for i in 1..size - 1 {
                for j in 0..size {
                    next[(i, j)] /= 2.0;
                }
            }
            theta = next;
        }

        let half_width = sigma * ((states - 1) as f64 / (1.0 - rho * rho)).sqrt();
        let step = 2.0 * half_width / (states - 1) as f64;
        let values = DVector::from_fn(states, |i, _| mean - half_width + step * i as f64);
        Self::new(values, theta)
    }

    /// Number of shock states.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Shock values indexed by state.
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Row-stochastic transition matrix.
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    /// Shock value of state `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Probability of moving from shock state `from` to shock state `to`.
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.transition[(from, to)]
    }

    /// Long-run distribution of the shock.
    pub fn stationary_distribution(&self) -> Result<DVector<f64>> {
        let (mu, _) = stationary_distribution(&self.transition, &StationaryOptions::default())?;
        Ok(mu)
    }

    /// Simulates a path of shock indices of the given length starting from `initial`.
    pub fn simulate(&self, initial: usize, length: usize, seed: u64) -> Result<Vec<usize>> {
        if initial >= self.size() {
            return Err(AiyagariError::dimension_mismatch(
                "initial shock state",
                self.size(),
                initial,
            ));
        }
        let samplers = self.samplers()?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut path = Vec::with_capacity(length);
        let mut state = initial;
        for _ in 0..length {
            path.push(state);
            state = samplers[state].sample(&mut rng);
        }
        Ok(path)
    }

    /// One alias-method sampler per row of the transition matrix.
    pub(crate) fn samplers(&self) -> Result<Vec<WeightedAliasIndex<f64>>> {
        self.transition
            .row_iter()
            .map(|row| {
                WeightedAliasIndex::new(row.iter().copied().collect()).map_err(|_| {
                    AiyagariError::NumericalError {
                        context: "shock sampler construction",
                    }
                })
            })
            .collect()
    }
}

/// Checks that `matrix` is square with finite, non-negative rows summing to one.
pub(crate) fn validate_stochastic(matrix: &DMatrix<f64>) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(AiyagariError::dimension_mismatch(
            "stochastic matrix columns",
            matrix.nrows(),
            matrix.ncols(),
        ));
    }
    for (row_index, row) in matrix.row_iter().enumerate() {
        let mut sum = 0.0;
        for (col, value) in row.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                return Err(AiyagariError::InvalidProbability {
                    row: row_index,
                    col,
                    value: *value,
                });
            }
            sum += value;
        }
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(AiyagariError::InvalidTransitionRow {
                row: row_index,
                sum,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rows_sum_to_one() {
        let chain = ShockChain::rouwenhorst(7, 0.9, 0.1, 1.0).unwrap();
        for row in chain.transition().row_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_rows_that_do_not_sum_to_one() {
        let result = ShockChain::from_rows(vec![0.1, 1.0], &[vec![0.9, 0.2], vec![0.1, 0.9]]);
        assert!(matches!(
            result,
            Err(AiyagariError::InvalidTransitionRow { row: 0, .. })
        ));
    }

    #[test]
    fn rejects_negative_probabilities() {
        let result = ShockChain::from_rows(vec![0.1, 1.0], &[vec![1.1, -0.1], vec![0.1, 0.9]]);
        assert!(matches!(
            result,
            Err(AiyagariError::InvalidProbability { row: 0, col: 1, .. })
        ));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let result = ShockChain::from_rows(Vec::new(), &[]);
        assert!(matches!(result, Err(AiyagariError::EmptyShockChain)));
    }

    #[test]
    fn rouwenhorst_matches_ar1_moments() {
        let rho = 0.8;
        let sigma = 0.2;
        let chain = ShockChain::rouwenhorst(5, rho, sigma, 1.5).unwrap();
        let mu = chain.stationary_distribution().unwrap();

        let mean = mu.dot(chain.values());
        assert_relative_eq!(mean, 1.5, epsilon = 1e-10);

        let variance: f64 = chain
            .values()
            .iter()
            .zip(mu.iter())
            .map(|(z, p)| p * (z - mean).powi(2))
            .sum();
        assert_relative_eq!(variance, sigma * sigma / (1.0 - rho * rho), epsilon = 1e-10);

        // E[z' | z] - mean = rho (z - mean) holds state by state.
        for i in 0..chain.size() {
            let conditional = chain.transition().row(i).transpose().dot(chain.values());
            assert_relative_eq!(
                conditional - mean,
                rho * (chain.value(i) - mean),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn simulation_is_reproducible_and_respects_absorbing_states() {
        let chain = ShockChain::from_rows(vec![0.0, 1.0], &[vec![0.5, 0.5], vec![0.0, 1.0]]).unwrap();
        let first = chain.simulate(0, 200, 11).unwrap();
        let second = chain.simulate(0, 200, 11).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], 0);

        let entered = first.iter().position(|&s| s == 1).unwrap();
        assert!(first[entered..].iter().all(|&s| s == 1));
    }
}
