//! Derivative-free optimizers for pose search.

pub mod nelder_mead;
pub mod trait_;

pub use nelder_mead::NelderMead;
pub use trait_::{OptStatus, Optimizer, OptimizerResult, Tolerances};
