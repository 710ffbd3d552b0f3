//! Solver configuration and diagnostics for the household problem and its stationary distribution.

use serde::{Deserialize, Serialize};

/// Algorithm used to solve the discrete dynamic program.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DpMethod {
    /// Greedy improvement plus exact policy evaluation; stops when the policy repeats.
    PolicyIteration,
    /// Successive application of the Bellman operator.
    ValueIteration,
    /// Greedy improvement plus `k` sweeps of approximate policy evaluation.
    ModifiedPolicyIteration { k: usize },
}

impl DpMethod {
    /// Human-readable name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            DpMethod::PolicyIteration => "policy iteration",
            DpMethod::ValueIteration => "value iteration",
            DpMethod::ModifiedPolicyIteration { .. } => "modified policy iteration",
        }
    }
}

/// Configuration for the discrete dynamic program solver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DpOptions {
    /// Solution algorithm.
    pub method: DpMethod,
    /// Maximum number of outer iterations allowed before aborting.
    pub max_iterations: usize,
    /// Value-function accuracy target for value iteration and modified policy iteration.
    pub epsilon: f64,
}

impl Default for DpOptions {
    fn default() -> Self {
        Self {
            method: DpMethod::PolicyIteration,
            max_iterations: 250,
            epsilon: 1e-3,
        }
    }
}

impl DpOptions {
    /// Overrides the solution method.
    pub fn with_method(mut self, method: DpMethod) -> Self {
        self.method = method;
        self
    }

    /// Overrides the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Overrides the accuracy target.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Diagnostics returned alongside a dynamic program solution.
#[derive(Clone, Debug, Serialize)]
pub struct DpSummary {
    /// Method that produced the solution.
    pub method: DpMethod,
    /// Number of outer iterations performed.
    pub iterations: usize,
}

/// Algorithm used for the stationary distribution of a finite chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationaryMethod {
    /// Grassmann–Taksar–Heyman elimination on the selected recurrent class.
    Gth,
    /// Repeated left multiplication `mu <- mu P` from the uniform distribution.
    PowerIteration,
}

/// Configuration for the stationary distribution solver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StationaryOptions {
    /// Solution algorithm.
    pub method: StationaryMethod,
    /// Supremum norm tolerance for power iteration.
    pub tolerance: f64,
    /// Maximum number of power iterations.
    pub max_iterations: usize,
}

impl Default for StationaryOptions {
    fn default() -> Self {
        Self {
            method: StationaryMethod::Gth,
            tolerance: 1e-12,
            max_iterations: 100_000,
        }
    }
}

impl StationaryOptions {
    /// Overrides the solution method.
    pub fn with_method(mut self, method: StationaryMethod) -> Self {
        self.method = method;
        self
    }

    /// Overrides the power-iteration tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Diagnostics returned alongside a stationary distribution.
#[derive(Clone, Debug, Serialize)]
pub struct StationarySummary {
    /// Number of power iterations performed (zero for direct elimination).
    pub iterations: usize,
    /// Number of recurrent classes found in the chain.
    pub recurrent_classes: usize,
    /// Number of states in the class that carries the distribution.
    pub support: usize,
}
