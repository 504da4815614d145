//! Probability distributions used as pose priors.
//!
//! One distribution instance may back the priors of several tracked
//! objects, so priors are held through shared ownership ([`DistPtr`]).

use std::f64::consts::PI;
use std::sync::Arc;

/// A univariate probability density evaluated in log space.
pub trait Dist: Send + Sync {
    fn log_prob(&self, x: f64) -> f64;
}

/// Shared handle to a prior distribution.
pub type DistPtr = Arc<dyn Dist>;

/// Univariate normal distribution.
#[derive(Debug, Clone, Copy)]
pub struct NormalDist {
    mean: f64,
    std_dev: f64,
}

impl NormalDist {
    /// # Panics
    /// Panics when `std_dev` is not strictly positive.
    pub fn new(mean: f64, std_dev: f64) -> Self {
        assert!(std_dev > 0.0, "standard deviation must be positive");
        Self { mean, std_dev }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

impl Dist for NormalDist {
    fn log_prob(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std_dev;
        -0.5 * z * z - self.std_dev.ln() - 0.5 * (2.0 * PI).ln()
    }
}
