//! Discrete dynamic programs: `v(s) = max_a R(s, a) + beta * sum_s' Q(s, a, s') v(s')`.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::arrays::{RewardArray, TransitionArray};
use crate::error::{AiyagariError, Result};
use crate::solving::{DpMethod, DpOptions, DpSummary};

/// Optimal value, policy, and the Markov chain the policy induces.
#[derive(Clone, Debug, Serialize)]
pub struct DpSolution {
    /// Value function indexed by state.
    pub value: DVector<f64>,
    /// Chosen action for every state.
    pub policy: Vec<usize>,
    /// `n x n` transition matrix of states under the policy.
    pub transition: DMatrix<f64>,
    /// Solver diagnostics.
    pub summary: DpSummary,
}

/// A discounted discrete dynamic program over borrowed reward and transition arrays.
#[derive(Clone, Copy, Debug)]
pub struct DiscreteDp<'a> {
    reward: &'a RewardArray,
    transition: &'a TransitionArray,
    beta: f64,
}

impl<'a> DiscreteDp<'a> {
    /// Validates shapes, the discount factor, and that every state has a feasible action.
    pub fn new(reward: &'a RewardArray, transition: &'a TransitionArray, beta: f64) -> Result<Self> {
        if reward.state_count() != transition.state_count() {
            return Err(AiyagariError::dimension_mismatch(
                "transition states",
                reward.state_count(),
                transition.state_count(),
            ));
        }
        if reward.action_count() != transition.action_count() {
            return Err(AiyagariError::dimension_mismatch(
                "transition actions",
                reward.action_count(),
                transition.action_count(),
            ));
        }
        if !(0.0..1.0).contains(&beta) {
            return Err(AiyagariError::invalid_parameter(
                "beta",
                beta,
                "discount factor must lie in [0, 1)",
            ));
        }
        for state in 0..reward.state_count() {
            if !(0..reward.action_count()).any(|action| reward.is_feasible(state, action)) {
                return Err(AiyagariError::NoFeasibleAction { state });
            }
        }

        Ok(Self {
            reward,
            transition,
            beta,
        })
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.reward.state_count()
    }

    /// Discount factor.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Solves the program with the configured method.
    pub fn solve(&self, options: &DpOptions) -> Result<DpSolution> {
        let (value, policy, iterations) = match options.method {
            DpMethod::PolicyIteration => self.policy_iteration(options)?,
            DpMethod::ValueIteration => self.value_iteration(options)?,
            DpMethod::ModifiedPolicyIteration { k } => {
                self.modified_policy_iteration(options, k)?
            }
        };
        debug!(
            "{} converged in {} iterations over {} states",
            options.method.name(),
            iterations,
            self.state_count()
        );

        let transition = self.policy_transition(&policy);
        Ok(DpSolution {
            value,
            policy,
            transition,
            summary: DpSummary {
                method: options.method,
                iterations,
            },
        })
    }

    /// Applies the Bellman operator, returning `Tv` and the greedy policy.
    ///
    /// Ties go to the lowest action index; infeasible actions are never chosen.
    pub fn bellman(&self, value: &DVector<f64>) -> (DVector<f64>, Vec<usize>) {
        let n = self.state_count();
        let mut updated = DVector::zeros(n);
        let mut policy = vec![0usize; n];
        for state in 0..n {
            let mut best = f64::NEG_INFINITY;
            let mut choice = None;
            for action in 0..self.reward.action_count() {
                if !self.reward.is_feasible(state, action) {
                    continue;
                }
                let candidate = self.reward.get(state, action)
                    + self.beta * self.transition.expectation(state, action, value);
                if choice.is_none() || candidate > best {
                    best = candidate;
                    choice = Some(action);
                }
            }
            // `new` guarantees a feasible action in every state.
            policy[state] = choice.unwrap_or(0);
            updated[state] = best;
        }
        (updated, policy)
    }

    /// `R_sigma + beta P_sigma v`.
    pub fn policy_operator(&self, policy: &[usize], value: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.state_count(), |state, _| {
            let action = policy[state];
            self.reward.get(state, action)
                + self.beta * self.transition.expectation(state, action, value)
        })
    }

    /// Exact value of following `policy` forever: solves `(I - beta P_sigma) v = R_sigma`.
    pub fn evaluate_policy(&self, policy: &[usize]) -> Result<DVector<f64>> {
        let n = self.state_count();
        if policy.len() != n {
            return Err(AiyagariError::dimension_mismatch(
                "policy length",
                n,
                policy.len(),
            ));
        }
        let rewards = DVector::from_fn(n, |state, _| self.reward.get(state, policy[state]));
        if rewards.iter().any(|r| !r.is_finite()) {
            return Err(AiyagariError::NumericalError {
                context: "policy evaluation with an infeasible action",
            });
        }
        let system = DMatrix::identity(n, n) - self.policy_transition(policy) * self.beta;
        system
            .lu()
            .solve(&rewards)
            .ok_or_else(|| AiyagariError::singular("policy evaluation"))
    }

    /// Dense `n x n` transition matrix under `policy`.
    pub fn policy_transition(&self, policy: &[usize]) -> DMatrix<f64> {
        let n = self.state_count();
        let mut matrix = DMatrix::zeros(n, n);
        for (state, action) in policy.iter().enumerate() {
            for (next, probability) in self.transition.row(state, *action) {
                matrix[(state, next)] += probability;
            }
        }
        matrix
    }

    /// Row-wise maximum of the reward array, the starting value for every method.
    fn initial_value(&self) -> DVector<f64> {
        DVector::from_fn(self.state_count(), |state, _| {
            self.reward.matrix().row(state).max()
        })
    }

    fn policy_iteration(&self, options: &DpOptions) -> Result<(DVector<f64>, Vec<usize>, usize)> {
        let (_, mut policy) = self.bellman(&self.initial_value());
        let mut previous: Option<DVector<f64>> = None;
        let mut max_gap = f64::INFINITY;

        for iteration in 1..=options.max_iterations {
            let value = self.evaluate_policy(&policy)?;
            if let Some(previous) = &previous {
                max_gap = (&value - previous).amax();
            }
            let (_, improved) = self.bellman(&value);
            let changed = improved
                .iter()
                .zip(policy.iter())
                .filter(|(a, b)| a != b)
                .count();
            trace!("policy iteration {iteration}: {changed} states changed action");
            if changed == 0 {
                return Ok((value, policy, iteration));
            }
            policy = improved;
            previous = Some(value);
        }

        Err(AiyagariError::DpDidNotConverge {
            method: DpMethod::PolicyIteration.name(),
            iterations: options.max_iterations,
            max_gap,
        })
    }

    fn value_iteration(&self, options: &DpOptions) -> Result<(DVector<f64>, Vec<usize>, usize)> {
        let tolerance = options.epsilon * (1.0 - self.beta) / (2.0 * self.beta);
        let mut value = self.initial_value();
        let mut max_gap = f64::INFINITY;

        for iteration in 1..=options.max_iterations {
            let (updated, policy) = self.bellman(&value);
            max_gap = (&updated - &value).amax();
            value = updated;
            trace!("value iteration {iteration}: max gap {max_gap}");
            if max_gap < tolerance {
                return Ok((value, policy, iteration));
            }
        }

        Err(AiyagariError::DpDidNotConverge {
            method: DpMethod::ValueIteration.name(),
            iterations: options.max_iterations,
            max_gap,
        })
    }

    fn modified_policy_iteration(
        &self,
        options: &DpOptions,
        k: usize,
    ) -> Result<(DVector<f64>, Vec<usize>, usize)> {
        let tolerance = options.epsilon * (1.0 - self.beta) / self.beta;
        let mut value = self.initial_value();
        let mut span = f64::INFINITY;

        for iteration in 1..=options.max_iterations {
            let (mut updated, policy) = self.bellman(&value);
            let diff = &updated - &value;
            let (low, high) = (diff.min(), diff.max());
            span = high - low;
            trace!("modified policy iteration {iteration}: span {span}");
            if span < tolerance {
                let shift = (low + high) / 2.0 * self.beta / (1.0 - self.beta);
                updated.add_scalar_mut(shift);
                return Ok((updated, policy, iteration));
            }
            for _ in 0..k {
                updated = self.policy_operator(&policy, &updated);
            }
            value = updated;
        }

        Err(AiyagariError::DpDidNotConverge {
            method: DpMethod::ModifiedPolicyIteration { k }.name(),
            iterations: options.max_iterations,
            max_gap: span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two states, two actions: action 0 stays put, action 1 switches state.
    fn toy() -> (RewardArray, TransitionArray) {
        let reward = RewardArray::from(DMatrix::from_row_slice(
            2,
            2,
            &[1.0, f64::NEG_INFINITY, 0.0, 2.0],
        ));
        let stay_or_switch = |state: usize| {
            let other = 1 - state;
            let mut block = DMatrix::zeros(2, 2);
            block[(0, state)] = 1.0;
            block[(1, other)] = 1.0;
            block
        };
        let transition = TransitionArray::from_dense(&[stay_or_switch(0), stay_or_switch(1)]).unwrap();
        (reward, transition)
    }

    #[test]
    fn policy_iteration_solves_the_toy_problem() {
        let (reward, transition) = toy();
        let ddp = DiscreteDp::new(&reward, &transition, 0.9).unwrap();
        let solution = ddp.solve(&DpOptions::default()).unwrap();

        // State 0 can only stay (1 per period). State 1 compares staying (0
        // forever) with switching (2 now, then 1 per period forever).
        assert_eq!(solution.policy, vec![0, 1]);
        assert_relative_eq!(solution.value[0], 10.0, epsilon = 1e-10);
        assert_relative_eq!(solution.value[1], 2.0 + 0.9 * 10.0, epsilon = 1e-10);
        assert_relative_eq!(solution.transition[(1, 0)], 1.0);
    }

    #[test]
    fn all_methods_agree() {
        let (reward, transition) = toy();
        let ddp = DiscreteDp::new(&reward, &transition, 0.9).unwrap();
        let exact = ddp.solve(&DpOptions::default()).unwrap();
        for method in [
            DpMethod::ValueIteration,
            DpMethod::ModifiedPolicyIteration { k: 20 },
        ] {
            let options = DpOptions::default()
                .with_method(method)
                .with_epsilon(1e-8)
                .with_max_iterations(10_000);
            let solution = ddp.solve(&options).unwrap();
            assert_eq!(solution.policy, exact.policy);
            assert_relative_eq!(solution.value, exact.value, epsilon = 1e-6);
        }
    }

    #[test]
    fn state_without_feasible_action_is_rejected() {
        let reward = RewardArray::from(DMatrix::from_row_slice(
            2,
            2,
            &[1.0, 0.0, f64::NEG_INFINITY, f64::NEG_INFINITY],
        ));
        let (_, transition) = toy();
        assert!(matches!(
            DiscreteDp::new(&reward, &transition, 0.9),
            Err(AiyagariError::NoFeasibleAction { state: 1 })
        ));
    }

    #[test]
    fn discount_factor_must_be_below_one() {
        let (reward, transition) = toy();
        assert!(DiscreteDp::new(&reward, &transition, 1.0).is_err());
        assert!(DiscreteDp::new(&reward, &transition, -0.1).is_err());
    }

    #[test]
    fn value_iteration_reports_exhausted_budget() {
        let (reward, transition) = toy();
        let ddp = DiscreteDp::new(&reward, &transition, 0.99).unwrap();
        let options = DpOptions::default()
            .with_method(DpMethod::ValueIteration)
            .with_epsilon(1e-12)
            .with_max_iterations(3);
        assert!(matches!(
            ddp.solve(&options),
            Err(AiyagariError::DpDidNotConverge { iterations: 3, .. })
        ));
    }
}
