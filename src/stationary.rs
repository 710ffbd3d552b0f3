//! Stationary distributions of finite Markov chains.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::{AiyagariError, Result};
use crate::markov::validate_stochastic;
use crate::solving::{StationaryMethod, StationaryOptions, StationarySummary};

/// Computes a probability vector `mu` with `mu = mu P`.
///
/// The chain is first split into communication classes. The distribution is
/// supported on the recurrent class containing the lowest state index;
/// transient states and other recurrent classes get zero mass.
pub fn stationary_distribution(
    transition: &DMatrix<f64>,
    options: &StationaryOptions,
) -> Result<(DVector<f64>, StationarySummary)> {
    validate_stochastic(transition)?;
    let n = transition.nrows();
    if n == 0 {
        return Err(AiyagariError::dimension_mismatch("stationary states", 1, 0));
    }

    let classes = recurrent_classes(transition);
    if classes.len() > 1 {
        warn!(
            "chain has {} recurrent classes; using the one containing state {}",
            classes.len(),
            classes[0][0]
        );
    }
    let class = &classes[0];
    let sub = DMatrix::from_fn(class.len(), class.len(), |i, j| {
        transition[(class[i], class[j])]
    });

    let (local, iterations) = match options.method {
        StationaryMethod::Gth => (gth_solve(&sub), 0),
        StationaryMethod::PowerIteration => power_iteration(&sub, options)?,
    };

    let mut mu = DVector::zeros(n);
    for (offset, state) in class.iter().enumerate() {
        mu[*state] = local[offset];
    }
    if mu.iter().any(|p| p.is_nan()) {
        return Err(AiyagariError::NumericalError {
            context: "stationary distribution",
        });
    }
    debug!(
        "stationary distribution over {} states supported on {} ({} iterations)",
        n,
        class.len(),
        iterations
    );

    Ok((
        mu,
        StationarySummary {
            iterations,
            recurrent_classes: classes.len(),
            support: class.len(),
        },
    ))
}

/// Grassmann–Taksar–Heyman elimination for an irreducible stochastic matrix.
///
/// Uses only additions, multiplications and divisions of non-negative
/// quantities, so it does not suffer from cancellation.
pub fn gth_solve(transition: &DMatrix<f64>) -> DVector<f64> {
    let n = transition.nrows();
    let mut a = transition.clone();
    let mut size = n;

    for k in 0..n.saturating_sub(1) {
        let scale: f64 = (k + 1..n).map(|j| a[(k, j)]).sum();
        if scale <= 0.0 {
            // {0, ..., k} is closed; solve on that block alone.
            size = k + 1;
            break;
        }
        for i in k + 1..n {
            a[(i, k)] /= scale;
        }
        for j in k + 1..n {
            let akj = a[(k, j)];
            if akj == 0.0 {
                continue;
            }
            for i in k + 1..n {
                let aik = a[(i, k)];
                a[(i, j)] += aik * akj;
            }
        }
    }

    let mut x = DVector::zeros(n);
    x[size - 1] = 1.0;
    for k in (0..size - 1).rev() {
        x[k] = (k + 1..size).map(|i| x[i] * a[(i, k)]).sum();
    }
    let total = x.sum();
    x / total
}

fn power_iteration(
    transition: &DMatrix<f64>,
    options: &StationaryOptions,
) -> Result<(DVector<f64>, usize)> {
    let n = transition.nrows();
    let transposed = transition.transpose();
    let mut mu = DVector::from_element(n, 1.0 / n as f64);
    let mut max_gap = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        let next = &transposed * &mu;
        max_gap = (&next - &mu).amax();
        mu = next;
        if max_gap < options.tolerance {
            let total = mu.sum();
            return Ok((mu / total, iteration));
        }
    }

    Err(AiyagariError::StationaryDidNotConverge {
        iterations: options.max_iterations,
        max_gap,
    })
}

/// Recurrent (closed) communication classes, each sorted, ordered by smallest member.
pub fn recurrent_classes(transition: &DMatrix<f64>) -> Vec<Vec<usize>> {
    let n = transition.nrows();
    let mut forward = vec![Vec::new(); n];
    let mut backward = vec![Vec::new(); n];
    for i in 0..n {
        for j in 0..n {
            if transition[(i, j)] > 0.0 {
                forward[i].push(j);
                backward[j].push(i);
            }
        }
    }

    let components = strongly_connected_components(&forward, &backward);
    let component_count = components.iter().copied().max().map_or(0, |c| c + 1);

    let mut closed = vec![true; component_count];
    for (i, edges) in forward.iter().enumerate() {
        if edges.iter().any(|j| components[*j] != components[i]) {
            closed[components[i]] = false;
        }
    }

    let mut classes: Vec<Vec<usize>> = vec![Vec::new(); component_count];
    for (state, component) in components.iter().enumerate() {
        if closed[*component] {
            classes[*component].push(state);
        }
    }
    classes.retain(|class| !class.is_empty());
    classes.sort_by_key(|class| class[0]);
    classes
}

/// Kosaraju's algorithm with explicit stacks; returns a component id per state.
fn strongly_connected_components(forward: &[Vec<usize>], backward: &[Vec<usize>]) -> Vec<usize> {
    let n = forward.len();
    let mut visited = vec![false; n];
    let mut finish_order = Vec::with_capacity(n);

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut stack = vec![(start, 0usize)];
        while let Some((node, child)) = stack.last_mut() {
            if let Some(&next) = forward[*node].get(*child) {
                *child += 1;
                if !visited[next] {
                    visited[next] = true;
                    stack.push((next, 0));
                }
            } else {
                finish_order.push(*node);
                stack.pop();
            }
        }
    }

    let mut component = vec![usize::MAX; n];
    let mut next_id = 0;
    for &root in finish_order.iter().rev() {
        if component[root] != usize::MAX {
            continue;
        }
        component[root] = next_id;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for &prev in &backward[node] {
                if component[prev] == usize::MAX {
                    component[prev] = next_id;
                    stack.push(prev);
                }
            }
        }
        next_id += 1;
    }
    component
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ergodic() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            3,
            &[0.5, 0.4, 0.1, 0.2, 0.6, 0.2, 0.3, 0.3, 0.4],
        )
    }

    #[test]
    fn gth_solution_is_invariant() {
        let p = ergodic();
        let (mu, summary) = stationary_distribution(&p, &StationaryOptions::default()).unwrap();
        assert_eq!(summary.recurrent_classes, 1);
        assert_relative_eq!(mu.sum(), 1.0, epsilon = 1e-12);
        let next = p.transpose() * &mu;
        assert_relative_eq!(next, mu, epsilon = 1e-12);
    }

    #[test]
    fn power_iteration_agrees_with_gth() {
        let p = ergodic();
        let (gth, _) = stationary_distribution(&p, &StationaryOptions::default()).unwrap();
        let options = StationaryOptions::default().with_method(StationaryMethod::PowerIteration);
        let (power, summary) = stationary_distribution(&p, &options).unwrap();
        assert!(summary.iterations > 0);
        assert_relative_eq!(gth, power, epsilon = 1e-10);
    }

    #[test]
    fn transient_states_get_no_mass() {
        // State 0 drains into the closed class {1, 2}.
        let p = DMatrix::from_row_slice(3, 3, &[0.5, 0.25, 0.25, 0.0, 0.1, 0.9, 0.0, 0.8, 0.2]);
        let (mu, summary) = stationary_distribution(&p, &StationaryOptions::default()).unwrap();
        assert_eq!(summary.support, 2);
        assert_eq!(mu[0], 0.0);
        assert_relative_eq!(mu[1], 0.8 / 1.7, epsilon = 1e-12);
        assert_relative_eq!(mu[2], 0.9 / 1.7, epsilon = 1e-12);
    }

    #[test]
    fn picks_the_recurrent_class_with_the_lowest_state() {
        let p = DMatrix::from_row_slice(4, 4, &[
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        ]);
        assert_eq!(recurrent_classes(&p), vec![vec![1, 3], vec![2]]);
        let (mu, summary) = stationary_distribution(&p, &StationaryOptions::default()).unwrap();
        assert_eq!(summary.recurrent_classes, 2);
        assert_relative_eq!(mu, DVector::from_vec(vec![0.0, 0.5, 0.0, 0.5]), epsilon = 1e-12);
    }

    #[test]
    fn power_iteration_reports_non_convergence_on_periodic_chains() {
        let p = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 0.5, 0.0, 0.5, 0.0, 1.0, 0.0]);
        let options = StationaryOptions {
            method: StationaryMethod::PowerIteration,
            tolerance: 1e-12,
            max_iterations: 500,
        };
        assert!(matches!(
            stationary_distribution(&p, &options),
            Err(AiyagariError::StationaryDidNotConverge { iterations: 500, .. })
        ));

        // Direct elimination still finds the unique invariant distribution.
        let (mu, _) = stationary_distribution(&p, &StationaryOptions::default()).unwrap();
        assert_relative_eq!(mu, DVector::from_vec(vec![0.25, 0.5, 0.25]), epsilon = 1e-12);
    }
}
