//! Penalty function trait.

use xrt_core::camera::CameraModel;
use xrt_core::frame::FrameTransform;

use crate::error::Result;

/// Everything a penalty may consult when scoring candidate poses.
///
/// The registration core treats the camera associations and intermediate
/// frames as opaque; penalties that use them must be handed lists whose
/// lengths match the view/frame counts of the run.
pub struct PenaltyContext<'a> {
    /// Candidate camera-to-object poses: one list per tracked object, one
    /// entry per view/frame.
    pub cams_wrt_objs: &'a [Vec<FrameTransform>],
    pub num_projs: usize,
    pub cams: &'a [CameraModel],
    /// Index of the camera used by each view.
    pub cam_assocs: &'a [usize],
    /// Whether each intermediate frame is expressed relative to the volume.
    pub inter_frames_wrt_vol: &'a [bool],
    pub inter_frames: &'a [FrameTransform],
    /// Per-object registration starting estimates; deviations are scored
    /// against these.
    pub regi_xform_guesses: &'a [FrameTransform],
    /// Full pose history from the optimization, when available.
    pub xforms_from_opt: Option<&'a [Vec<FrameTransform>]>,
}

/// Scores how implausible a set of candidate poses is under a prior.
///
/// Larger values are less favorable; the pipeline adds the penalty to the
/// similarity aggregate before handing it to the minimizer.
pub trait PenaltyFn {
    fn compute(&self, ctx: &PenaltyContext<'_>) -> Result<f64>;
}
