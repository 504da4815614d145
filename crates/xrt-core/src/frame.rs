//! Rigid (SE(3)) frame transforms and pose parametrization.
//!
//! Poses are optimized as 6-dof real vectors: a rotation vector (axis *
//! angle, radians) followed by a translation (same units as the camera
//! geometry, typically mm).

use nalgebra::{Isometry3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// A rigid transform between two frames.
pub type FrameTransform = Isometry3<f64>;

/// Number of parameters in the rigid pose vector.
pub const SE3_NUM_PARAMS: usize = 6;

/// Rotation magnitude of a transform, in radians.
pub fn rot_mag(xform: &FrameTransform) -> f64 {
    xform.rotation.angle()
}

/// Translation magnitude of a transform.
pub fn trans_mag(xform: &FrameTransform) -> f64 {
    xform.translation.vector.norm()
}

/// Build a rigid transform from a 6-dof parameter vector.
///
/// `params[0..3]` is a rotation vector, `params[3..6]` a translation.
pub fn se3_from_params(params: &[f64]) -> FrameTransform {
    assert_eq!(params.len(), SE3_NUM_PARAMS, "rigid pose needs 6 parameters");

    let rot_vec = Vector3::new(params[0], params[1], params[2]);
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::new(rot_vec));
    let trans = Translation3::new(params[3], params[4], params[5]);

    Isometry3::from_parts(trans, rot)
}

/// Recover the 6-dof parameter vector of a rigid transform.
///
/// Inverse of [`se3_from_params`] up to the usual angle wrapping.
pub fn params_from_se3(xform: &FrameTransform) -> [f64; SE3_NUM_PARAMS] {
    let rot_vec = xform.rotation.scaled_axis();
    let t = xform.translation.vector;

    [rot_vec[0], rot_vec[1], rot_vec[2], t[0], t[1], t[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_identity_magnitudes() {
        let id = FrameTransform::identity();
        assert!(rot_mag(&id).abs() < 1e-12);
        assert!(trans_mag(&id).abs() < 1e-12);
    }

    #[test]
    fn test_rot_mag() {
        let params = [FRAC_PI_4, 0.0, 0.0, 0.0, 0.0, 0.0];
        let xform = se3_from_params(&params);
        assert!((rot_mag(&xform) - FRAC_PI_4).abs() < 1e-10);
    }

    #[test]
    fn test_trans_mag() {
        let params = [0.0, 0.0, 0.0, 3.0, 4.0, 0.0];
        let xform = se3_from_params(&params);
        assert!((trans_mag(&xform) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_params_roundtrip() {
        let params = [0.1, -0.2, 0.05, 10.0, -3.5, 42.0];
        let xform = se3_from_params(&params);
        let back = params_from_se3(&xform);

        for (a, b) in params.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-10, "expected {a}, got {b}");
        }
    }
}
