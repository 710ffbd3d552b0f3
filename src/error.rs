use thiserror::Error;

/// Unified error type for `aiyagari` operations.
#[derive(Debug, Error)]
pub enum AiyagariError {
    /// Raised when provided arrays or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, often the model-implied value.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when the asset grid bounds or size cannot describe a strictly increasing grid.
    #[error("invalid asset grid: need a_min < a_max and at least 2 points, found [{a_min}, {a_max}] with {size} points")]
    InvalidAssetGrid { a_min: f64, a_max: f64, size: usize },

    /// Raised when a user-supplied asset grid is not strictly increasing.
    #[error("asset grid must be strictly increasing; value at index {index} is {value}")]
    NonIncreasingGrid { index: usize, value: f64 },

    /// Raised when a shock chain has no states.
    #[error("shock chain must have at least one state")]
    EmptyShockChain,

    /// Raised when a transition matrix row does not sum to one.
    #[error("transition row {row} must sum to one, found {sum}")]
    InvalidTransitionRow { row: usize, sum: f64 },

    /// Raised when a transition matrix entry is negative or not finite.
    #[error("transition probability at ({row}, {col}) must be finite and non-negative, found {value}")]
    InvalidProbability { row: usize, col: usize, value: f64 },

    /// Raised when a scalar model parameter is outside its admissible range.
    #[error("parameter `{name}` = {value} is invalid: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter as it appears in configuration.
        name: &'static str,
        value: f64,
        /// Admissible range or other constraint that was violated.
        reason: &'static str,
    },

    /// Raised when every action available in a state yields non-positive consumption.
    #[error("state {state} has no feasible action")]
    NoFeasibleAction { state: usize },

    /// Raised when a firm pricing function is evaluated outside its domain.
    #[error("{context} is undefined at r = {r} with depreciation {delta} (requires r + delta > 0)")]
    PricingDomain {
        context: &'static str,
        r: f64,
        delta: f64,
    },

    /// Raised when the household dynamic program does not converge.
    #[error("{method} did not converge after {iterations} iterations; last max gap {max_gap}")]
    DpDidNotConverge {
        /// Name of the solution method that was running.
        method: &'static str,
        iterations: usize,
        max_gap: f64,
    },

    /// Raised when the stationary distribution iteration does not converge.
    #[error("stationary distribution did not converge after {iterations} iterations; last max gap {max_gap}")]
    StationaryDidNotConverge { iterations: usize, max_gap: f64 },

    /// Raised when the root-finding bracket does not contain a sign change.
    #[error("no sign change on [{lower}, {upper}]: f(lower) = {f_lower}, f(upper) = {f_upper}")]
    NoSignChange {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },

    /// Raised when the root finder exhausts its iteration budget.
    #[error("root finder did not converge after {iterations} iterations; bracket width {width}")]
    RootDidNotConverge { iterations: usize, width: f64 },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },

    /// Raised when numerical routines produce NaN.
    #[error("encountered NaN during {context}")]
    NumericalError { context: &'static str },
}

/// Coarse classification of [`AiyagariError`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid grids, chains, or parameters supplied by the caller.
    Configuration,
    /// A pricing function evaluated outside `r + delta > 0`.
    Domain,
    /// The dynamic program or stationary distribution solver ran out of iterations.
    SolverNonConvergence,
    /// The equilibrium bracket is invalid or the root finder ran out of iterations.
    RootBracket,
    /// Singular systems or NaN values.
    Numerical,
}

impl AiyagariError {
    /// Helper to format a [`DimensionMismatch`](AiyagariError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper for rejecting an out-of-range scalar parameter.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Helper to raise when a matrix factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DimensionMismatch { .. }
            | Self::InvalidAssetGrid { .. }
            | Self::NonIncreasingGrid { .. }
            | Self::EmptyShockChain
            | Self::InvalidTransitionRow { .. }
            | Self::InvalidProbability { .. }
            | Self::InvalidParameter { .. }
            | Self::NoFeasibleAction { .. } => ErrorKind::Configuration,
            Self::PricingDomain { .. } => ErrorKind::Domain,
            Self::DpDidNotConverge { .. } | Self::StationaryDidNotConverge { .. } => {
                ErrorKind::SolverNonConvergence
            }
            Self::NoSignChange { .. } | Self::RootDidNotConverge { .. } => ErrorKind::RootBracket,
            Self::SingularMatrix { .. } | Self::NumericalError { .. } => ErrorKind::Numerical,
        }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, AiyagariError>;
