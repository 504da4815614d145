//! Bound-constrained Nelder-Mead simplex search.

use tracing::{debug, trace};

use crate::error::{RegiError, Result};

use super::trait_::{OptStatus, Optimizer, OptimizerResult, Tolerances};

const ALPHA: f64 = 1.0; // reflection
const GAMMA: f64 = 2.0; // expansion
const RHO: f64 = 0.5; // contraction
const SIGMA: f64 = 0.5; // shrink

/// Derivative-free simplex minimizer with optional per-parameter bounds.
///
/// Candidate vertices that leave the bounds are clamped onto them; with
/// [`abort_on_bound_violation`] the run instead stops in the
/// `BoundViolation` state, returning the best vertex found so far.
///
/// [`abort_on_bound_violation`]: NelderMead::abort_on_bound_violation
pub struct NelderMead {
    bounds: Option<Vec<[f64; 2]>>,
    tols: Tolerances,
    max_iters: usize,
    init_step: f64,
    abort_on_violation: bool,
    status: OptStatus,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self::new()
    }
}

impl NelderMead {
    pub fn new() -> Self {
        Self {
            bounds: None,
            tols: Tolerances::default(),
            max_iters: 1000,
            init_step: 1.0,
            abort_on_violation: false,
            status: OptStatus::Initialized,
        }
    }

    /// Per-parameter `[lower, upper]` bounds.
    pub fn with_bounds(mut self, bounds: Vec<[f64; 2]>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_tolerances(mut self, tols: Tolerances) -> Self {
        self.tols = tols;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Edge length of the initial simplex.
    pub fn with_init_step(mut self, init_step: f64) -> Self {
        self.init_step = init_step;
        self
    }

    pub fn abort_on_bound_violation(mut self, abort: bool) -> Self {
        self.abort_on_violation = abort;
        self
    }

    /// Clamp a candidate onto the bounds; reports whether clamping moved it.
    fn clamp(&self, params: &mut [f64]) -> bool {
        let Some(bounds) = &self.bounds else {
            return false;
        };

        let mut violated = false;
        for (p, b) in params.iter_mut().zip(bounds.iter()) {
            let clamped = p.clamp(b[0], b[1]);
            if clamped != *p {
                violated = true;
                *p = clamped;
            }
        }
        violated
    }
}

impl Optimizer for NelderMead {
    fn minimize(
        &mut self,
        objective: &mut dyn FnMut(&[f64]) -> Result<f64>,
        init: &[f64],
    ) -> Result<OptimizerResult> {
        let n = init.len();

        if n == 0 {
            return Err(RegiError::invalid_state("empty parameter vector"));
        }
        if let Some(bounds) = &self.bounds {
            if bounds.len() != n {
                return Err(RegiError::invalid_state(format!(
                    "{} bounds supplied for {} parameters",
                    bounds.len(),
                    n
                )));
            }
            if bounds.iter().any(|b| b[0] > b[1]) {
                return Err(RegiError::invalid_state("lower bound exceeds upper bound"));
            }
        }

        self.status = OptStatus::Running;

        let mut num_evals = 0usize;

        let mut x0 = init.to_vec();
        let clamped_init = self.clamp(&mut x0);
        if clamped_init && self.abort_on_violation {
            self.status = OptStatus::BoundViolation;
            num_evals += 1;
            let f0 = objective(&x0)?;
            return Ok(OptimizerResult {
                params: x0,
                objective: f0,
                status: self.status,
                iterations: 0,
                num_obj_evals: num_evals,
            });
        }

        // Initial simplex: the start point plus one perturbed vertex per
        // dimension. A perturbation that a bound collapses back onto the
        // start point is retried in the opposite direction.
        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);

        num_evals += 1;
        let f0 = objective(&x0)?;
        simplex.push((x0.clone(), f0));

        for i in 0..n {
            let mut xi = x0.clone();
            xi[i] += self.init_step;
            let mut clamped = self.clamp(&mut xi);

            if xi[i] == x0[i] {
                xi[i] -= self.init_step;
                clamped |= self.clamp(&mut xi);
            }

            if clamped && self.abort_on_violation {
                self.status = OptStatus::BoundViolation;
                return Ok(OptimizerResult {
                    params: x0,
                    objective: f0,
                    status: self.status,
                    iterations: 0,
                    num_obj_evals: num_evals,
                });
            }

            num_evals += 1;
            let fi = objective(&xi)?;
            simplex.push((xi, fi));
        }

        let mut iterations = 0usize;

        for iter in 0..self.max_iters {
            iterations = iter + 1;

            simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            trace!(
                iter,
                best = simplex[0].1,
                worst = simplex[n].1,
                "simplex iteration"
            );

            // Convergence on either the parameter spread or the objective
            // spread of the simplex.
            let f_spread = (simplex[n].1 - simplex[0].1).abs();
            let x_spread = simplex
                .iter()
                .flat_map(|(x, _)| {
                    x.iter()
                        .zip(simplex[0].0.iter())
                        .map(|(a, b)| (a - b).abs())
                })
                .fold(0.0f64, f64::max);

            if x_spread < self.tols.x_tol || f_spread < self.tols.f_tol {
                self.status = OptStatus::Converged;
                break;
            }

            // Centroid of all vertices but the worst.
            let mut centroid = vec![0.0; n];
            for (x, _) in simplex.iter().take(n) {
                for (c, v) in centroid.iter_mut().zip(x.iter()) {
                    *c += v / n as f64;
                }
            }

            let worst = simplex[n].0.clone();
            let f_worst = simplex[n].1;

            let propose = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(worst.iter())
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let mut reflected = propose(ALPHA);
            if self.clamp(&mut reflected) && self.abort_on_violation {
                self.status = OptStatus::BoundViolation;
                break;
            }
            num_evals += 1;
            let f_reflected = objective(&reflected)?;

            if f_reflected < simplex[0].1 {
                // Best so far; try to expand further along the same ray.
                let mut expanded = propose(GAMMA);
                if self.clamp(&mut expanded) && self.abort_on_violation {
                    simplex[n] = (reflected, f_reflected);
                    self.status = OptStatus::BoundViolation;
                    break;
                }
                num_evals += 1;
                let f_expanded = objective(&expanded)?;

                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
            } else if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
            } else {
                // Contract toward the centroid, outside or inside
                // depending on which side the reflection landed.
                let mut contracted = if f_reflected < f_worst {
                    propose(RHO * ALPHA)
                } else {
                    propose(-RHO)
                };
                self.clamp(&mut contracted);
                num_evals += 1;
                let f_contracted = objective(&contracted)?;

                if f_contracted < f_worst.min(f_reflected) {
                    simplex[n] = (contracted, f_contracted);
                } else {
                    // Shrink everything toward the best vertex.
                    let best = simplex[0].0.clone();
                    for (x, f) in simplex.iter_mut().skip(1) {
                        for (v, b) in x.iter_mut().zip(best.iter()) {
                            *v = b + SIGMA * (*v - b);
                        }
                        self.clamp(x);
                        num_evals += 1;
                        *f = objective(x)?;
                    }
                }
            }
        }

        if self.status == OptStatus::Running {
            self.status = OptStatus::IterationLimit;
        }

        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let (best_params, best_obj) = simplex.swap_remove(0);

        debug!(
            status = ?self.status,
            iterations,
            num_evals,
            objective = best_obj,
            "simplex search finished"
        );

        Ok(OptimizerResult {
            params: best_params,
            objective: best_obj,
            status: self.status,
            iterations,
            num_obj_evals: num_evals,
        })
    }

    fn status(&self) -> OptStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_bowl(center: &[f64]) -> impl FnMut(&[f64]) -> Result<f64> + '_ {
        move |p: &[f64]| {
            Ok(p.iter()
                .zip(center.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum())
        }
    }

    #[test]
    fn test_converges_on_quadratic_bowl() {
        let center = [1.5, -2.0, 0.25];
        let mut objective = quadratic_bowl(&center);

        let mut nm = NelderMead::new()
            .with_bounds(vec![[-10.0, 10.0]; 3])
            .with_max_iters(2000)
            .with_init_step(0.5);

        let result = nm.minimize(&mut objective, &[0.0, 0.0, 0.0]).unwrap();

        assert_eq!(result.status, OptStatus::Converged);
        for (p, c) in result.params.iter().zip(center.iter()) {
            assert!((p - c).abs() < 1e-3, "expected {c}, got {p}");
        }
        assert!(result.objective < 1e-6);
    }

    #[test]
    fn test_unbounded_search_also_converges() {
        let center = [3.0, 4.0];
        let mut objective = quadratic_bowl(&center);

        let mut nm = NelderMead::new().with_max_iters(2000);
        let result = nm.minimize(&mut objective, &[0.0, 0.0]).unwrap();

        assert_eq!(result.status, OptStatus::Converged);
        assert!((result.params[0] - 3.0).abs() < 1e-3);
        assert!((result.params[1] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_minimum_outside_bounds_lands_on_boundary() {
        // Minimum at 5, but the feasible region stops at 2.
        let center = [5.0];
        let mut objective = quadratic_bowl(&center);

        let mut nm = NelderMead::new()
            .with_bounds(vec![[-2.0, 2.0]])
            .with_max_iters(2000);

        let result = nm.minimize(&mut objective, &[0.0]).unwrap();

        assert!(matches!(
            result.status,
            OptStatus::Converged | OptStatus::IterationLimit
        ));
        assert!((result.params[0] - 2.0).abs() < 1e-2, "got {}", result.params[0]);
    }

    #[test]
    fn test_iteration_limit_is_terminal_not_an_error() {
        let center = [1.0, 1.0];
        let mut objective = quadratic_bowl(&center);

        let mut nm = NelderMead::new()
            .with_max_iters(2)
            .with_tolerances(Tolerances {
                x_tol: 1e-15,
                f_tol: 1e-15,
            });

        let result = nm.minimize(&mut objective, &[10.0, 10.0]).unwrap();

        assert_eq!(result.status, OptStatus::IterationLimit);
        // Best-found result is still usable.
        assert!(result.objective <= 81.0 * 2.0 + 1e-9);
    }

    #[test]
    fn test_abort_on_bound_violation() {
        let center = [50.0];
        let mut objective = quadratic_bowl(&center);

        let mut nm = NelderMead::new()
            .with_bounds(vec![[-1.0, 1.0]])
            .abort_on_bound_violation(true)
            .with_init_step(10.0)
            .with_max_iters(100);

        let result = nm.minimize(&mut objective, &[0.0]).unwrap();
        assert_eq!(result.status, OptStatus::BoundViolation);
    }

    #[test]
    fn test_abort_applies_to_initial_simplex() {
        let center = [0.0];
        let mut objective = quadratic_bowl(&center);

        // The feasible start point is fine, but the perturbed initial
        // vertex leaves the bounds.
        let mut nm = NelderMead::new()
            .with_bounds(vec![[-1.0, 1.0]])
            .abort_on_bound_violation(true)
            .with_init_step(10.0);

        let result = nm.minimize(&mut objective, &[0.5]).unwrap();

        assert_eq!(result.status, OptStatus::BoundViolation);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.params, vec![0.5]);
    }

    #[test]
    fn test_mismatched_bounds_rejected() {
        let mut objective = |_: &[f64]| Ok(0.0);
        let mut nm = NelderMead::new().with_bounds(vec![[-1.0, 1.0]]);

        assert!(matches!(
            nm.minimize(&mut objective, &[0.0, 0.0]),
            Err(RegiError::InvalidState(_))
        ));
    }

    #[test]
    fn test_objective_error_propagates() {
        let mut objective =
            |_: &[f64]| -> Result<f64> { Err(RegiError::invalid_state("boom")) };
        let mut nm = NelderMead::new();

        assert!(nm.minimize(&mut objective, &[0.0]).is_err());
    }
}
