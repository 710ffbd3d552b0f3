//! Reward and transition arrays of the household dynamic program.

use nalgebra::{DMatrix, DVector};

use crate::error::{AiyagariError, Result};
use crate::firm::Prices;
use crate::grid::StateSpace;
use crate::utility::Utility;

/// Reward of every `(state, action)` pair, `n x a_size`.
///
/// An action is the index of next-period assets on the grid. Pairs whose
/// implied consumption is not strictly positive hold `-inf`.
#[derive(Clone, Debug)]
pub struct RewardArray {
    values: DMatrix<f64>,
}

impl RewardArray {
    /// Builds a fresh reward array at the given prices.
    pub fn build(space: &StateSpace, utility: &Utility, prices: Prices) -> Result<Self> {
        let mut reward = Self {
            values: DMatrix::from_element(
                space.state_count(),
                space.asset_count(),
                f64::NEG_INFINITY,
            ),
        };
        reward.refill(space, utility, prices)?;
        Ok(reward)
    }

    /// Rewrites this buffer in place for new prices.
    ///
    /// Fails with [`AiyagariError::NumericalError`] when utility overflows for a
    /// feasible pair, leaving the buffer partly rewritten.
    pub fn refill(&mut self, space: &StateSpace, utility: &Utility, prices: Prices) -> Result<()> {
        let n = space.state_count();
        let a_size = space.asset_count();
        if self.values.nrows() != n {
            return Err(AiyagariError::dimension_mismatch(
                "reward array rows",
                n,
                self.values.nrows(),
            ));
        }
        if self.values.ncols() != a_size {
            return Err(AiyagariError::dimension_mismatch(
                "reward array columns",
                a_size,
                self.values.ncols(),
            ));
        }
        if !prices.r.is_finite() || !prices.w.is_finite() {
            return Err(AiyagariError::NumericalError {
                context: "reward construction prices",
            });
        }

        let grid = space.grid().values();
        for state in 0..n {
            let cash = prices.w * space.shock_value(state)
                + (1.0 + prices.r) * space.asset_value(state);
            for (action, next_assets) in grid.iter().enumerate() {
                let consumption = cash - next_assets;
                self.values[(state, action)] = if consumption > 0.0 {
                    let value = utility.value(consumption);
                    if !value.is_finite() {
                        return Err(AiyagariError::NumericalError {
                            context: "utility of positive consumption overflowed",
                        });
                    }
                    value
                } else {
                    f64::NEG_INFINITY
                };
            }
        }
        Ok(())
    }

    /// Number of states (rows).
    pub fn state_count(&self) -> usize {
        self.values.nrows()
    }

    /// Number of actions (columns).
    pub fn action_count(&self) -> usize {
        self.values.ncols()
    }

    /// Reward of taking `action` in `state`.
    #[inline]
    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[(state, action)]
    }

    /// Whether `action` yields strictly positive consumption in `state`.
    #[inline]
    pub fn is_feasible(&self, state: usize, action: usize) -> bool {
        self.values[(state, action)] > f64::NEG_INFINITY
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}

impl From<DMatrix<f64>> for RewardArray {
    fn from(values: DMatrix<f64>) -> Self {
        Self { values }
    }
}

/// Transition probabilities of every `(state, action, next_state)` triple.
///
/// The logical shape is `n x a_size x n`. Next-period assets are the chosen
/// action, so for each `(state, action)` only the `z_size` next states on that
/// asset row carry mass; those are the only entries stored. The array has no
/// mutating methods once built.
#[derive(Clone, Debug)]
pub struct TransitionArray {
    state_count: usize,
    action_count: usize,
    stride: usize,
    next_states: Vec<usize>,
    probabilities: Vec<f64>,
}

impl TransitionArray {
    /// Builds the transition array of the household problem.
    ///
    /// Entry `(i, j, k)` equals `P[z(i), z(k)]` when the asset index of `k` is `j`.
    pub fn build(space: &StateSpace) -> Self {
        let n = space.state_count();
        let a_size = space.asset_count();
        let z_size = space.shock_count();
        let transition = space.chain().transition();

        let mut next_states = Vec::with_capacity(n * a_size * z_size);
        let mut probabilities = Vec::with_capacity(n * a_size * z_size);
        for state in 0..n {
            let shock = space.decode(state).shock;
            for action in 0..a_size {
                for next_shock in 0..z_size {
                    let next = space.encode(action, next_shock);
                    next_states.push(next);
                    probabilities.push(transition[(shock, next_shock)]);
                }
            }
        }

        Self {
            state_count: n,
            action_count: a_size,
            stride: z_size,
            next_states,
            probabilities,
        }
    }

    /// Builds a general transition array from one dense `a_size x n` block per state.
    ///
    /// Zero entries are dropped. Every `(state, action)` row must be a probability vector.
    pub fn from_dense(blocks: &[DMatrix<f64>]) -> Result<Self> {
        let n = blocks.len();
        if n == 0 {
            return Err(AiyagariError::dimension_mismatch("transition states", 1, 0));
        }
        let a_size = blocks[0].nrows();

        let mut rows: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n * a_size);
        for block in blocks {
            if block.nrows() != a_size {
                return Err(AiyagariError::dimension_mismatch(
                    "transition actions",
                    a_size,
                    block.nrows(),
                ));
            }
            if block.ncols() != n {
                return Err(AiyagariError::dimension_mismatch(
                    "transition next states",
                    n,
                    block.ncols(),
                ));
            }
            for row in block.row_iter() {
                let mut sum = 0.0;
                let mut entries = Vec::new();
                for (next, p) in row.iter().enumerate() {
                    if !p.is_finite() || *p < 0.0 {
                        return Err(AiyagariError::InvalidProbability {
                            row: rows.len(),
                            col: next,
                            value: *p,
                        });
                    }
                    if *p > 0.0 {
                        entries.push((next, *p));
                    }
                    sum += p;
                }
                if (sum - 1.0).abs() > crate::markov::ROW_SUM_TOLERANCE {
                    return Err(AiyagariError::InvalidTransitionRow {
                        row: rows.len(),
                        sum,
                    });
                }
                rows.push(entries);
            }
        }

        // Pad every row to a common stride with zero-probability entries.
        let stride = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut next_states = Vec::with_capacity(rows.len() * stride);
        let mut probabilities = Vec::with_capacity(rows.len() * stride);
        for entries in rows {
            let pad = stride - entries.len();
            for (next, p) in entries {
                next_states.push(next);
                probabilities.push(p);
            }
            next_states.extend(std::iter::repeat(0).take(pad));
            probabilities.extend(std::iter::repeat(0.0).take(pad));
        }

        Ok(Self {
            state_count: n,
            action_count: a_size,
            stride,
            next_states,
            probabilities,
        })
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// Number of actions.
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    #[inline]
    fn offset(&self, state: usize, action: usize) -> usize {
        (state * self.action_count + action) * self.stride
    }

    /// Stored `(next_state, probability)` pairs of a `(state, action)` row.
    #[inline]
    pub fn row(&self, state: usize, action: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.offset(state, action);
        let end = start + self.stride;
        self.next_states[start..end]
            .iter()
            .copied()
            .zip(self.probabilities[start..end].iter().copied())
    }

    /// Probability of reaching `next` after taking `action` in `state`.
    pub fn get(&self, state: usize, action: usize, next: usize) -> f64 {
        self.row(state, action)
            .filter(|(k, _)| *k == next)
            .map(|(_, p)| p)
            .sum()
    }

    /// Expected value of `values` over next states after taking `action` in `state`.
    #[inline]
    pub fn expectation(&self, state: usize, action: usize, values: &DVector<f64>) -> f64 {
        self.row(state, action).map(|(k, p)| p * values[k]).sum()
    }

    /// Dense `(state, action)` row of length `n`.
    pub fn dense_row(&self, state: usize, action: usize) -> DVector<f64> {
        let mut row = DVector::zeros(self.state_count);
        for (k, p) in self.row(state, action) {
            row[k] += p;
        }
        row
    }
}
