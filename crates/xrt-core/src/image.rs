//! Host-side 2D projection images.
//!
//! Projection images live on the host in their stored pixel representation
//! (float or integer) and are uploaded to a backend device as f32 tensors
//! when a similarity metric binds them.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use serde::{Deserialize, Serialize};

/// Pixel representations a projection store may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelKind {
    F32,
    U16,
    U8,
}

/// Scalar types usable as stored pixels.
///
/// All representations convert through f32; integer conversions saturate.
/// The `bytemuck::Pod` bound is what lets pixel buffers be persisted as raw
/// little-endian byte payloads without per-type codec code.
pub trait PixelScalar:
    Copy + Default + PartialOrd + bytemuck::Pod + Send + Sync + 'static
{
    const KIND: PixelKind;

    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}

impl PixelScalar for f32 {
    const KIND: PixelKind = PixelKind::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(v: f32) -> Self {
        v
    }
}

impl PixelScalar for u16 {
    const KIND: PixelKind = PixelKind::U16;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, u16::MAX as f32) as u16
    }
}

impl PixelScalar for u8 {
    const KIND: PixelKind = PixelKind::U8;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, u8::MAX as f32) as u8
    }
}

/// A 2D image with physical pixel spacing and origin.
///
/// Row-major storage: pixel `(r, c)` is `pixels[r * cols + c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image<P> {
    rows: usize,
    cols: usize,
    /// Physical size of one pixel along (row, col), e.g. mm on the detector.
    spacing: [f64; 2],
    /// Physical coordinate of pixel (0, 0).
    origin: [f64; 2],
    pixels: Vec<P>,
}

impl<P: PixelScalar> Image<P> {
    /// Create an image from a row-major pixel buffer.
    ///
    /// Returns `None` when the buffer length does not match `rows * cols`.
    pub fn from_pixels(
        rows: usize,
        cols: usize,
        spacing: [f64; 2],
        origin: [f64; 2],
        pixels: Vec<P>,
    ) -> Option<Self> {
        (pixels.len() == rows * cols).then_some(Self {
            rows,
            cols,
            spacing,
            origin,
            pixels,
        })
    }

    /// A zero-filled image with unit spacing and zero origin.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            spacing: [1.0, 1.0],
            origin: [0.0, 0.0],
            pixels: vec![P::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn spacing(&self) -> [f64; 2] {
        self.spacing
    }

    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    /// # Panics
    /// Panics when `(row, col)` is outside the image.
    pub fn get(&self, row: usize, col: usize) -> P {
        assert!(row < self.rows && col < self.cols, "pixel index out of range");
        self.pixels[row * self.cols + col]
    }

    /// # Panics
    /// Panics when `(row, col)` is outside the image.
    pub fn set(&mut self, row: usize, col: usize, val: P) {
        assert!(row < self.rows && col < self.cols, "pixel index out of range");
        self.pixels[row * self.cols + col] = val;
    }

    /// Convert to another pixel representation, saturating through f32.
    pub fn cast<Q: PixelScalar>(&self) -> Image<Q> {
        Image {
            rows: self.rows,
            cols: self.cols,
            spacing: self.spacing,
            origin: self.origin,
            pixels: self.pixels.iter().map(|p| Q::from_f32(p.to_f32())).collect(),
        }
    }

    /// Upload the pixel data to a device as an f32 tensor of shape `[rows, cols]`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data: Vec<f32> = self.pixels.iter().map(|p| p.to_f32()).collect();
        Tensor::from_data(
            TensorData::new(data, Shape::new([self.rows, self.cols])),
            device,
        )
    }
}
