//! Image similarity metrics.
//!
//! Metrics score how well a synthetic (moving) projection matches the
//! acquired (fixed) image of one view.

pub mod grad_ncc;
pub mod ncc;
pub mod trait_;

pub use grad_ncc::GradNccSimMetric;
pub use ncc::NccSimMetric;
pub use trait_::ImgSimMetric;
