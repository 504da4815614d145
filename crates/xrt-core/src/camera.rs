//! Pinhole camera geometry for projection views.
//!
//! A camera maps world points into detector pixel coordinates through an
//! extrinsic world-to-camera transform followed by a 3x3 intrinsic matrix.
//! The registration layer consumes this as an opaque capability; only
//! construction, persistence, and point projection are exposed.

use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::frame::FrameTransform;

/// Projective geometry of a single 2D view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// 3x3 intrinsic matrix mapping camera coordinates to pixel coordinates.
    pub intrins: Matrix3<f64>,
    /// World-to-camera rigid transform.
    pub extrins: FrameTransform,
    /// Detector height in pixels.
    pub num_rows: usize,
    /// Detector width in pixels.
    pub num_cols: usize,
    /// Physical detector pixel size along (row, col).
    pub pixel_spacing: [f64; 2],
}

impl CameraModel {
    /// A camera looking down +z with the given focal length (in pixels) and
    /// principal point at the detector center.
    pub fn with_focal_len(
        focal_len: f64,
        num_rows: usize,
        num_cols: usize,
        pixel_spacing: [f64; 2],
        extrins: FrameTransform,
    ) -> Self {
        let mut intrins = Matrix3::identity();
        intrins[(0, 0)] = focal_len;
        intrins[(1, 1)] = focal_len;
        intrins[(0, 2)] = (num_cols as f64) / 2.0;
        intrins[(1, 2)] = (num_rows as f64) / 2.0;

        Self {
            intrins,
            extrins,
            num_rows,
            num_cols,
            pixel_spacing,
        }
    }

    /// Project a world point to continuous pixel coordinates `(col, row)`.
    ///
    /// Returns `None` for points at, or behind, the camera plane.
    pub fn project(&self, world_pt: &Point3<f64>) -> Option<Point2<f64>> {
        let cam_pt = self.extrins * world_pt;

        if cam_pt.z <= f64::EPSILON {
            return None;
        }

        let homog: Vector3<f64> = self.intrins * cam_pt.coords;
        Some(Point2::new(homog.x / homog.z, homog.y / homog.z))
    }

    /// Whether continuous pixel coordinates fall on the detector.
    pub fn on_detector(&self, px: &Point2<f64>) -> bool {
        px.x >= 0.0
            && px.y >= 0.0
            && px.x < self.num_cols as f64
            && px.y < self.num_rows as f64
    }
}
