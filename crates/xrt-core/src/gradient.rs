//! Directional image gradients on device tensors.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Forward-difference gradients of a 2D image along rows and columns.
///
/// Output tensors match the input shape; the last row (respectively
/// column) is zero-padded.
pub fn gradient_2d<B: Backend>(img: &Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [h, w] = img.dims();
    let device = img.device();

    // Gradient along rows (vertical direction).
    let below = img.clone().slice([1..h, 0..w]);
    let above = img.clone().slice([0..(h - 1), 0..w]);
    let grad_r = below - above;
    let zeros_r = Tensor::zeros([1, w], &device);
    let grad_r = Tensor::cat(vec![grad_r, zeros_r], 0);

    // Gradient along columns (horizontal direction).
    let right = img.clone().slice([0..h, 1..w]);
    let left = img.clone().slice([0..h, 0..(w - 1)]);
    let grad_c = right - left;
    let zeros_c = Tensor::zeros([h, 1], &device);
    let grad_c = Tensor::cat(vec![grad_c, zeros_c], 1);

    (grad_r, grad_c)
}
