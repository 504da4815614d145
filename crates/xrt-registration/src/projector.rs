//! Synthetic projection rendering seam.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::Point3;

use xrt_core::camera::CameraModel;
use xrt_core::frame::FrameTransform;

use crate::error::{RegiError, Result};

/// Renders a synthetic 2D image of the 3D model for one view and one
/// candidate pose.
///
/// The pipeline consumes this as an opaque capability; full DRR renderers
/// plug in here.
pub trait Projector<B: Backend> {
    fn num_views(&self) -> usize;

    /// Camera geometry of a view.
    fn camera(&self, view: usize) -> Result<&CameraModel>;

    /// Render view `view` with the model posed by `pose`.
    ///
    /// Implementations may reuse internal buffers across calls; output
    /// dimensions must stay fixed for the life of the projector.
    fn project(&mut self, view: usize, pose: &FrameTransform) -> Result<Tensor<B, 2>>;
}

/// Splats a 3D point cloud through each view's camera with bilinear
/// footprints.
///
/// A deliberately simple model good enough for tests and examples; the
/// bilinear spread keeps the rendered image continuous in the pose, which
/// derivative-free search relies on.
pub struct PointSplatProjector<B: Backend> {
    cams: Vec<CameraModel>,
    points: Vec<Point3<f64>>,
    device: B::Device,
    /// Host-side accumulation buffer reused across calls.
    scratch: Vec<f32>,
}

impl<B: Backend> PointSplatProjector<B> {
    pub fn new(cams: Vec<CameraModel>, points: Vec<Point3<f64>>, device: B::Device) -> Self {
        Self {
            cams,
            points,
            device,
            scratch: Vec::new(),
        }
    }
}

impl<B: Backend> Projector<B> for PointSplatProjector<B> {
    fn num_views(&self) -> usize {
        self.cams.len()
    }

    fn camera(&self, view: usize) -> Result<&CameraModel> {
        self.cams.get(view).ok_or(RegiError::OutOfRange {
            index: view,
            num_views: self.cams.len(),
        })
    }

    fn project(&mut self, view: usize, pose: &FrameTransform) -> Result<Tensor<B, 2>> {
        let cam = self.cams.get(view).ok_or(RegiError::OutOfRange {
            index: view,
            num_views: self.cams.len(),
        })?;

        let rows = cam.num_rows;
        let cols = cam.num_cols;

        self.scratch.clear();
        self.scratch.resize(rows * cols, 0.0);

        for pt in &self.points {
            let world_pt = pose * pt;

            let Some(px) = cam.project(&world_pt) else {
                continue;
            };

            let c0 = px.x.floor();
            let r0 = px.y.floor();
            let fc = (px.x - c0) as f32;
            let fr = (px.y - r0) as f32;
            let c0 = c0 as isize;
            let r0 = r0 as isize;

            // Bilinear footprint over the four neighboring pixels.
            for (dr, dc, w) in [
                (0, 0, (1.0 - fr) * (1.0 - fc)),
                (0, 1, (1.0 - fr) * fc),
                (1, 0, fr * (1.0 - fc)),
                (1, 1, fr * fc),
            ] {
                let r = r0 + dr;
                let c = c0 + dc;
                if r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols {
                    self.scratch[(r as usize) * cols + (c as usize)] += w;
                }
            }
        }

        Ok(Tensor::from_data(
            TensorData::new(self.scratch.clone(), Shape::new([rows, cols])),
            &self.device,
        ))
    }
}
