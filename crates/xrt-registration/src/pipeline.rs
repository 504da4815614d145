//! Single-object 2D/3D intensity registration pipeline.
//!
//! Combines a projector, one similarity metric per view, optional view
//! weights, and an optional pose penalty into a scalar objective over the
//! 6-dof rigid pose vector, then minimizes it through the [`Optimizer`]
//! interface (a bounded simplex search by default).

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::{debug, info};

use xrt_core::camera::CameraModel;
use xrt_core::frame::{params_from_se3, se3_from_params, FrameTransform};
use xrt_io::proj_data::ProjDataF32;

use crate::error::{RegiError, Result};
use crate::metric::ImgSimMetric;
use crate::optimizer::{NelderMead, OptStatus, Optimizer, Tolerances};
use crate::penalty::{PenaltyContext, PenaltyFn};
use crate::projector::Projector;

/// Outcome of a registration run.
#[derive(Debug, Clone)]
pub struct RegiResult {
    /// Best pose found.
    pub pose: FrameTransform,
    /// Objective value at the best pose (weighted similarity plus
    /// penalty).
    pub objective: f64,
    pub status: OptStatus,
    pub iterations: usize,
}

/// A penalty function together with the geometry context it is scored
/// under.
///
/// The pipeline tracks a single object, so `guesses` must hold exactly
/// one starting estimate.
pub struct PenaltySetup {
    pub func: Box<dyn PenaltyFn>,
    pub cams: Vec<CameraModel>,
    pub cam_assocs: Vec<usize>,
    pub inter_frames_wrt_vol: Vec<bool>,
    pub inter_frames: Vec<FrameTransform>,
    pub guesses: Vec<FrameTransform>,
}

/// Intensity-based registration of one 3D object against a set of fixed
/// 2D views.
///
/// Fixed images are bound and metric resources allocated at construction;
/// each objective evaluation renders the candidate pose through the
/// projector, rebinds the moving images, and aggregates the per-view
/// scores.
pub struct IntensityRegi2D3D<B: Backend, P: Projector<B>> {
    projector: P,
    metrics: Vec<Box<dyn ImgSimMetric<B>>>,
    view_weights: Vec<f64>,
    penalty: Option<PenaltySetup>,
    max_iters: usize,
    num_obj_evals: usize,
}

impl<B: Backend, P: Projector<B>> IntensityRegi2D3D<B, P> {
    /// Bind `fixed` images to `metrics`, one per projector view, and
    /// allocate metric resources.
    ///
    /// Views are weighted uniformly until [`set_view_weights`] is called.
    ///
    /// [`set_view_weights`]: IntensityRegi2D3D::set_view_weights
    pub fn new(
        projector: P,
        mut metrics: Vec<Box<dyn ImgSimMetric<B>>>,
        fixed: Vec<Tensor<B, 2>>,
    ) -> Result<Self> {
        let num_views = projector.num_views();

        if num_views == 0 {
            return Err(RegiError::invalid_state("projector has no views"));
        }
        if metrics.len() != num_views || fixed.len() != num_views {
            return Err(RegiError::invalid_state(format!(
                "{} views, but {} metrics and {} fixed images",
                num_views,
                metrics.len(),
                fixed.len()
            )));
        }

        for (metric, img) in metrics.iter_mut().zip(fixed) {
            metric.set_fixed(img);
            metric.allocate_resources()?;
        }

        let uniform = 1.0 / num_views as f64;

        Ok(Self {
            projector,
            metrics,
            view_weights: vec![uniform; num_views],
            penalty: None,
            max_iters: 1000,
            num_obj_evals: 0,
        })
    }

    /// Build from projection records, uploading each record's image to
    /// `device` as the fixed image of its view.
    ///
    /// Every record must carry a decoded image; metadata-only records are
    /// an `InvalidState` error.
    pub fn with_proj_data(
        projector: P,
        metrics: Vec<Box<dyn ImgSimMetric<B>>>,
        proj_data: &[ProjDataF32],
        device: &B::Device,
    ) -> Result<Self> {
        let fixed = proj_data
            .iter()
            .enumerate()
            .map(|(view, record)| {
                record
                    .img
                    .as_ref()
                    .map(|img| img.to_tensor(device))
                    .ok_or_else(|| {
                        RegiError::invalid_state(format!("view {view} has no image data loaded"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(projector, metrics, fixed)
    }

    pub fn num_views(&self) -> usize {
        self.metrics.len()
    }

    /// Replace the uniform view weights.
    pub fn set_view_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        if weights.len() != self.metrics.len() {
            return Err(RegiError::invalid_state(format!(
                "{} weights for {} views",
                weights.len(),
                self.metrics.len()
            )));
        }

        self.view_weights = weights;
        Ok(())
    }

    /// Bind or clear one view's evaluation mask.
    pub fn set_mask(&mut self, view: usize, mask: Option<Tensor<B, 2>>) -> Result<()> {
        let metric = self.metrics.get_mut(view).ok_or(RegiError::OutOfRange {
            index: view,
            num_views: self.projector.num_views(),
        })?;

        metric.set_mask(mask);
        metric.allocate_resources()
    }

    pub fn set_penalty(&mut self, setup: PenaltySetup) -> Result<()> {
        if setup.guesses.len() != 1 {
            return Err(RegiError::invalid_state(format!(
                "{} pose guesses for a single-object run",
                setup.guesses.len()
            )));
        }

        self.penalty = Some(setup);
        Ok(())
    }

    pub fn set_max_iters(&mut self, max_iters: usize) {
        self.max_iters = max_iters;
    }

    /// Objective evaluations performed so far, across runs.
    pub fn num_obj_evals(&self) -> usize {
        self.num_obj_evals
    }

    /// Score one candidate pose vector.
    ///
    /// This is the raw objective handed to the minimizer; exposed so
    /// callers can probe the landscape or evaluate an external solution.
    pub fn evaluate(&mut self, params: &[f64]) -> Result<f64> {
        self.num_obj_evals += 1;

        let pose = se3_from_params(params);
        let mut total = 0.0;

        for view in 0..self.metrics.len() {
            let moving = self.projector.project(view, &pose)?;
            self.metrics[view].set_moving(moving);
            total += self.view_weights[view] * self.metrics[view].compute()?;
        }

        if let Some(setup) = &self.penalty {
            let cams_wrt_objs = vec![vec![pose; self.metrics.len()]];
            let ctx = PenaltyContext {
                cams_wrt_objs: &cams_wrt_objs,
                num_projs: self.metrics.len(),
                cams: &setup.cams,
                cam_assocs: &setup.cam_assocs,
                inter_frames_wrt_vol: &setup.inter_frames_wrt_vol,
                inter_frames: &setup.inter_frames,
                regi_xform_guesses: &setup.guesses,
                xforms_from_opt: None,
            };

            total += setup.func.compute(&ctx)?;
        }

        debug!(objective = total, "pose evaluated");

        Ok(total)
    }

    /// Run the registration from `init_pose` with a caller-supplied
    /// minimizer.
    ///
    /// The pipeline only consumes the [`Optimizer`] interface, so any
    /// minimizer over the 6-dof pose vector can drive the search.
    pub fn register_with(
        &mut self,
        init_pose: &FrameTransform,
        opt: &mut dyn Optimizer,
    ) -> Result<RegiResult> {
        let init_params = params_from_se3(init_pose);

        let mut objective = |params: &[f64]| self.evaluate(params);
        let opt_result = opt.minimize(&mut objective, &init_params)?;

        info!(
            status = ?opt_result.status,
            iterations = opt_result.iterations,
            num_obj_evals = opt_result.num_obj_evals,
            objective = opt_result.objective,
            "registration finished"
        );

        Ok(RegiResult {
            pose: se3_from_params(&opt_result.params),
            objective: opt_result.objective,
            status: opt_result.status,
            iterations: opt_result.iterations,
        })
    }

    /// Run the registration from `init_pose` with the default bounded
    /// simplex search.
    ///
    /// `bounds` are absolute per-parameter limits in the 6-dof pose
    /// vector; candidates outside them are clamped during the search.
    pub fn register(
        &mut self,
        init_pose: &FrameTransform,
        bounds: Option<Vec<[f64; 2]>>,
        tols: Tolerances,
    ) -> Result<RegiResult> {
        let mut opt = NelderMead::new()
            .with_tolerances(tols)
            .with_max_iters(self.max_iters);
        if let Some(bounds) = bounds {
            opt = opt.with_bounds(bounds);
        }

        self.register_with(init_pose, &mut opt)
    }
}
