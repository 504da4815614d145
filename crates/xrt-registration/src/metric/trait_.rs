//! Similarity metric trait.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::Result;

/// Similarity metric over one view's fixed and moving images.
///
/// Lower scores are better (loss convention), so scores can be summed with
/// pose penalties and handed to a minimizer directly.
///
/// Lifecycle: bind the fixed image once, call [`allocate_resources`]
/// whenever image dimensions change, then rebind the moving image and call
/// [`compute`] once per candidate pose. Device-side buffers are owned by
/// the metric and live until it is dropped or resources are reallocated.
///
/// [`allocate_resources`]: ImgSimMetric::allocate_resources
/// [`compute`]: ImgSimMetric::compute
pub trait ImgSimMetric<B: Backend> {
    /// Bind the fixed (acquired) image. The metric never mutates it.
    fn set_fixed(&mut self, fixed: Tensor<B, 2>);

    /// Bind the moving (synthetic) image for the next [`compute`].
    ///
    /// [`compute`]: ImgSimMetric::compute
    fn set_moving(&mut self, moving: Tensor<B, 2>);

    /// Bind or clear the evaluation mask (1.0 inside, 0.0 outside).
    /// Mask-derived cached state is recomputed lazily on the next compute.
    fn set_mask(&mut self, mask: Option<Tensor<B, 2>>);

    /// (Re)allocate backing buffers for the currently bound image
    /// dimensions. Must be called before the first compute and again after
    /// any dimension change; any previously held buffers of mismatched
    /// size are released first.
    fn allocate_resources(&mut self) -> Result<()>;

    /// Score the currently bound image pair. Deterministic for identical
    /// inputs; calling with unbound images is an `InvalidState` error.
    fn compute(&mut self) -> Result<f64>;
}
