//! Normalized cross correlation similarity metric.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::{RegiError, Result};

use super::trait_::ImgSimMetric;

const DENOM_EPS: f64 = 1e-10;

/// Masked zero-normalized cross correlation.
///
/// Score is -NCC, in `[-1, 1]`: -1 for a perfect (linear) intensity
/// relationship inside the mask.
///
/// Fixed-image statistics only change when the mask (or the fixed image
/// itself) changes, so they are cached on the device and reused across the
/// many thousand moving-image evaluations a registration run performs.
pub struct NccSimMetric<B: Backend> {
    device: B::Device,
    fixed: Option<Tensor<B, 2>>,
    moving: Option<Tensor<B, 2>>,
    mask: Option<Tensor<B, 2>>,
    /// Dimensions validated by the last `allocate_resources`.
    dims: Option<[usize; 2]>,
    mask_dirty: bool,
    fixed_centered: Option<Tensor<B, 2>>,
    fixed_sq_sum: f64,
    norm_px_count: f64,
}

impl<B: Backend> NccSimMetric<B> {
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            fixed: None,
            moving: None,
            mask: None,
            dims: None,
            mask_dirty: true,
            fixed_centered: None,
            fixed_sq_sum: 0.0,
            norm_px_count: 0.0,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Recompute mask-dependent cached state: the masked pixel count and
    /// the centered (and masked) fixed image with its squared sum.
    fn process_mask(&mut self) -> Result<()> {
        let fixed = self
            .fixed
            .as_ref()
            .ok_or_else(|| RegiError::invalid_state("no fixed image bound"))?;

        let (centered, sq_sum, count) = match &self.mask {
            Some(mask) => {
                let count: f64 = mask.clone().sum().into_scalar().elem();
                if count <= 0.0 {
                    return Err(RegiError::invalid_state("mask excludes every pixel"));
                }

                let masked = fixed.clone() * mask.clone();
                let mean: f64 = masked.sum().into_scalar().elem::<f64>() / count;
                let centered = (fixed.clone().sub_scalar(mean)) * mask.clone();
                let sq_sum: f64 = centered.clone().powf_scalar(2.0).sum().into_scalar().elem();

                (centered, sq_sum, count)
            }
            None => {
                let [h, w] = fixed.dims();
                let count = (h * w) as f64;
                let mean: f64 = fixed.clone().mean().into_scalar().elem();
                let centered = fixed.clone().sub_scalar(mean);
                let sq_sum: f64 = centered.clone().powf_scalar(2.0).sum().into_scalar().elem();

                (centered, sq_sum, count)
            }
        };

        self.fixed_centered = Some(centered);
        self.fixed_sq_sum = sq_sum;
        self.norm_px_count = count;
        self.mask_dirty = false;

        Ok(())
    }
}

impl<B: Backend> ImgSimMetric<B> for NccSimMetric<B> {
    fn set_fixed(&mut self, fixed: Tensor<B, 2>) {
        self.fixed = Some(fixed);
        self.mask_dirty = true;
    }

    fn set_moving(&mut self, moving: Tensor<B, 2>) {
        self.moving = Some(moving);
    }

    fn set_mask(&mut self, mask: Option<Tensor<B, 2>>) {
        self.mask = mask;
        self.mask_dirty = true;
    }

    fn allocate_resources(&mut self) -> Result<()> {
        let fixed = self
            .fixed
            .as_ref()
            .ok_or_else(|| RegiError::invalid_state("no fixed image bound"))?;

        let dims = fixed.dims();
        if dims[0] == 0 || dims[1] == 0 {
            return Err(RegiError::resource(format!(
                "unsupported image size {}x{}",
                dims[0], dims[1]
            )));
        }

        if let Some(mask) = &self.mask {
            if mask.dims() != dims {
                return Err(RegiError::resource(format!(
                    "mask size {:?} does not match image size {:?}",
                    mask.dims(),
                    dims
                )));
            }
        }

        // Release any stale cached buffers before re-deriving them.
        self.fixed_centered = None;
        self.mask_dirty = true;
        self.dims = Some(dims);

        Ok(())
    }

    fn compute(&mut self) -> Result<f64> {
        let dims = self
            .dims
            .ok_or_else(|| RegiError::invalid_state("allocate_resources has not been called"))?;

        if self.mask_dirty {
            self.process_mask()?;
        }

        let moving = self
            .moving
            .as_ref()
            .ok_or_else(|| RegiError::invalid_state("no moving image bound"))?;

        if moving.dims() != dims {
            return Err(RegiError::invalid_state(
                "image dimensions changed since allocate_resources",
            ));
        }

        let fixed_centered = self
            .fixed_centered
            .as_ref()
            .expect("cached by process_mask");

        let (moving_centered, moving_sq_sum) = match &self.mask {
            Some(mask) => {
                let masked = moving.clone() * mask.clone();
                let mean: f64 =
                    masked.sum().into_scalar().elem::<f64>() / self.norm_px_count;
                let centered = (moving.clone().sub_scalar(mean)) * mask.clone();
                let sq_sum: f64 = centered.clone().powf_scalar(2.0).sum().into_scalar().elem();
                (centered, sq_sum)
            }
            None => {
                let mean: f64 = moving.clone().mean().into_scalar().elem();
                let centered = moving.clone().sub_scalar(mean);
                let sq_sum: f64 = centered.clone().powf_scalar(2.0).sum().into_scalar().elem();
                (centered, sq_sum)
            }
        };

        let numerator: f64 = (fixed_centered.clone() * moving_centered)
            .sum()
            .into_scalar()
            .elem();

        let denominator = (self.fixed_sq_sum * moving_sq_sum).sqrt() + DENOM_EPS;

        Ok(-(numerator / denominator))
    }
}
