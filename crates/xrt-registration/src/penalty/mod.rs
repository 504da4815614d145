//! Pose regularization penalties.

pub mod se3_mag;
pub mod trait_;

pub use se3_mag::Se3MagPenalty;
pub use trait_::{PenaltyContext, PenaltyFn};
