//! Discretised household state space: the asset grid crossed with the shock chain.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{AiyagariError, Result};
use crate::markov::ShockChain;

/// Strictly increasing grid of feasible asset holdings.
#[derive(Clone, Debug, Serialize)]
pub struct AssetGrid {
    values: Vec<f64>,
}

impl AssetGrid {
    /// Evenly spaced grid from `a_min` to `a_max` inclusive.
    pub fn linspace(a_min: f64, a_max: f64, size: usize) -> Result<Self> {
        if size < 2 || !a_min.is_finite() || !a_max.is_finite() || a_min >= a_max {
            return Err(AiyagariError::InvalidAssetGrid {
                a_min,
                a_max,
                size,
            });
        }
        let step = (a_max - a_min) / (size - 1) as f64;
        let mut values: Vec<f64> = (0..size).map(|i| a_min + step * i as f64).collect();
        // Pin the endpoint so the last grid point is exactly `a_max`.
        values[size - 1] = a_max;
        Ok(Self { values })
    }

    /// Wraps a user-supplied grid after checking it is strictly increasing.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.len() < 2 {
            let first = values.first().copied().unwrap_or(f64::NAN);
            return Err(AiyagariError::InvalidAssetGrid {
                a_min: first,
                a_max: first,
                size: values.len(),
            });
        }
        for (index, window) in values.windows(2).enumerate() {
            if !window[0].is_finite() || !window[1].is_finite() || window[1] <= window[0] {
                return Err(AiyagariError::NonIncreasingGrid {
                    index: index + 1,
                    value: window[1],
                });
            }
        }
        Ok(Self { values })
    }

    /// Number of grid points.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Grid values in increasing order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Asset value at grid index `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Smallest grid point.
    pub fn min(&self) -> f64 {
        self.values[0]
    }

    /// Largest grid point.
    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }
}

/// Asset and shock indices of a single state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StateIndex {
    /// Index into the asset grid.
    pub asset: usize,
    /// Index into the shock chain.
    pub shock: usize,
}

/// Enumerated Cartesian product of the asset grid and the shock chain.
///
/// States are ordered asset-major: state `i` has asset index `i / z_size` and
/// shock index `i % z_size`. The index table and the value table share this
/// ordering row by row.
#[derive(Clone, Debug, Serialize)]
pub struct StateSpace {
    grid: AssetGrid,
    chain: ShockChain,
    indices: Vec<StateIndex>,
    values: DMatrix<f64>,
}

impl StateSpace {
    /// Enumerates every `(asset, shock)` pair exactly once.
    pub fn new(grid: AssetGrid, chain: ShockChain) -> Result<Self> {
        let a_size = grid.size();
        let z_size = chain.size();
        if a_size < 2 {
            return Err(AiyagariError::InvalidAssetGrid {
                a_min: grid.min(),
                a_max: grid.max(),
                size: a_size,
            });
        }
        if z_size == 0 {
            return Err(AiyagariError::EmptyShockChain);
        }

        let n = a_size * z_size;
        let mut indices = Vec::with_capacity(n);
        let mut values = DMatrix::zeros(n, 2);
        for asset in 0..a_size {
            for shock in 0..z_size {
                let row = indices.len();
                indices.push(StateIndex { asset, shock });
                values[(row, 0)] = grid.value(asset);
                values[(row, 1)] = chain.value(shock);
            }
        }

        Ok(Self {
            grid,
            chain,
            indices,
            values,
        })
    }

    /// Total number of states.
    pub fn state_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of asset grid points, which is also the number of actions.
    pub fn asset_count(&self) -> usize {
        self.grid.size()
    }

    /// Number of shock states.
    pub fn shock_count(&self) -> usize {
        self.chain.size()
    }

    /// The asset grid.
    pub fn grid(&self) -> &AssetGrid {
        &self.grid
    }

    /// The shock chain.
    pub fn chain(&self) -> &ShockChain {
        &self.chain
    }

    /// Precomputed index table; row `i` describes state `i`.
    pub fn indices(&self) -> &[StateIndex] {
        &self.indices
    }

    /// `n x 2` table of `(asset, shock)` values; row `i` describes state `i`.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Linear state index of an `(asset, shock)` pair.
    #[inline]
    pub fn encode(&self, asset: usize, shock: usize) -> usize {
        asset * self.chain.size() + shock
    }

    /// Asset and shock indices of linear state `state`.
    #[inline]
    pub fn decode(&self, state: usize) -> StateIndex {
        self.indices[state]
    }

    /// Asset holdings in state `state`.
    #[inline]
    pub fn asset_value(&self, state: usize) -> f64 {
        self.values[(state, 0)]
    }

    /// Shock value in state `state`.
    #[inline]
    pub fn shock_value(&self, state: usize) -> f64 {
        self.values[(state, 1)]
    }

    /// Asset value of every state, as a column vector.
    pub fn asset_values(&self) -> DVector<f64> {
        self.values.column(0).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_chain() -> ShockChain {
        ShockChain::symmetric_two_state(0.1, 1.0, 0.9).unwrap()
    }

    #[test]
    fn linspace_hits_both_endpoints() {
        let grid = AssetGrid::linspace(1e-10, 20.0, 200).unwrap();
        assert_eq!(grid.size(), 200);
        assert_eq!(grid.min(), 1e-10);
        assert_eq!(grid.max(), 20.0);
        assert!(grid.values().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn single_point_grid_is_rejected() {
        let result = AssetGrid::linspace(0.0, 20.0, 1);
        assert!(matches!(
            result,
            Err(AiyagariError::InvalidAssetGrid { size: 1, .. })
        ));
        assert!(AssetGrid::linspace(5.0, 5.0, 10).is_err());
        assert!(AssetGrid::linspace(6.0, 5.0, 10).is_err());
    }

    #[test]
    fn from_values_requires_strict_increase() {
        let result = AssetGrid::from_values(vec![0.0, 1.0, 1.0, 2.0]);
        assert!(matches!(
            result,
            Err(AiyagariError::NonIncreasingGrid { index: 2, .. })
        ));
    }

    #[test]
    fn decode_and_encode_are_inverse() {
        let chain = ShockChain::rouwenhorst(3, 0.5, 0.1, 1.0).unwrap();
        let grid = AssetGrid::linspace(0.0, 5.0, 7).unwrap();
        let space = StateSpace::new(grid, chain).unwrap();
        assert_eq!(space.state_count(), 21);

        for state in 0..space.state_count() {
            let StateIndex { asset, shock } = space.decode(state);
            assert_eq!(space.encode(asset, shock), state);
        }
        for asset in 0..space.asset_count() {
            for shock in 0..space.shock_count() {
                let index = space.decode(space.encode(asset, shock));
                assert_eq!(index, StateIndex { asset, shock });
            }
        }
    }

    #[test]
    fn index_and_value_tables_describe_the_same_state() {
        let grid = AssetGrid::linspace(0.0, 4.0, 5).unwrap();
        let space = StateSpace::new(grid, two_state_chain()).unwrap();
        for state in 0..space.state_count() {
            let index = space.decode(state);
            assert_eq!(space.asset_value(state), space.grid().value(index.asset));
            assert_eq!(space.shock_value(state), space.chain().value(index.shock));
        }
    }
}
