//! Optimizer trait for objective minimization.

use crate::error::Result;

/// Lifecycle state of an optimizer run.
///
/// `Converged` and `IterationLimit` are terminal; hitting the iteration
/// limit is not an error, the best-found result is still returned and the
/// caller decides whether it is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptStatus {
    Initialized,
    Running,
    Converged,
    IterationLimit,
    /// Only reached when configured to abort instead of clamping.
    BoundViolation,
}

/// Outcome of an optimizer run: the best parameter vector found and its
/// objective value, plus how the run ended.
#[derive(Debug, Clone)]
pub struct OptimizerResult {
    pub params: Vec<f64>,
    pub objective: f64,
    pub status: OptStatus,
    pub iterations: usize,
    pub num_obj_evals: usize,
}

/// Convergence tolerances on the parameter step and the objective step.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub x_tol: f64,
    pub f_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            x_tol: 1e-6,
            f_tol: 1e-9,
        }
    }
}

/// A local minimizer of a scalar objective over a fixed-dimension real
/// parameter vector.
///
/// No global optimality is guaranteed; multi-modal objectives need good
/// initial guesses or external restarts.
pub trait Optimizer {
    /// Minimize `objective` starting from `init`.
    ///
    /// The objective is evaluated synchronously; an `Err` from it aborts
    /// the run and propagates.
    fn minimize(
        &mut self,
        objective: &mut dyn FnMut(&[f64]) -> Result<f64>,
        init: &[f64],
    ) -> Result<OptimizerResult>;

    fn status(&self) -> OptStatus;
}
