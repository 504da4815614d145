//! End-to-end registration over synthetic splat renders.

use burn_ndarray::NdArray;
use nalgebra::Point3;

use xrt_core::camera::CameraModel;
use xrt_core::frame::{se3_from_params, trans_mag, FrameTransform};
use xrt_core::image::Image;
use xrt_io::proj_data::ProjData;
use xrt_registration::{
    GradNccSimMetric, ImgSimMetric, IntensityRegi2D3D, NccSimMetric, OptStatus,
    PointSplatProjector, Projector, RegiError, Tolerances,
};

type B = NdArray<f32>;

fn test_cam(extrins: FrameTransform) -> CameraModel {
    CameraModel::with_focal_len(60.0, 48, 48, [1.0, 1.0], extrins)
}

/// Two views at right angles, so in-plane and depth translation are both
/// observable.
fn test_cams() -> Vec<CameraModel> {
    let frontal = se3_from_params(&[0.0, 0.0, 0.0, 0.0, 0.0, 120.0]);
    let lateral = se3_from_params(&[0.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0, 120.0]);
    vec![test_cam(frontal), test_cam(lateral)]
}

fn test_points() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(0.0, 10.0, 0.0),
        Point3::new(0.0, 0.0, 10.0),
        Point3::new(-6.0, 4.0, -3.0),
        Point3::new(5.0, -7.0, 6.0),
    ]
}

/// Render the fixed views at the true pose.
fn render_fixed(true_pose: &FrameTransform) -> Vec<burn::tensor::Tensor<B, 2>> {
    let mut render = PointSplatProjector::<B>::new(test_cams(), test_points(), Default::default());
    (0..2)
        .map(|view| render.project(view, true_pose).unwrap())
        .collect()
}

fn grad_ncc_metrics(count: usize) -> Vec<Box<dyn ImgSimMetric<B>>> {
    (0..count)
        .map(|_| {
            Box::new(GradNccSimMetric::<B>::new(Default::default())) as Box<dyn ImgSimMetric<B>>
        })
        .collect()
}

#[test]
fn test_register_improves_translation_offset() {
    let true_pose = FrameTransform::identity();
    let fixed = render_fixed(&true_pose);

    let projector = PointSplatProjector::new(test_cams(), test_points(), Default::default());
    let mut pipeline = IntensityRegi2D3D::new(projector, grad_ncc_metrics(2), fixed).unwrap();

    let init_pose = se3_from_params(&[0.0, 0.0, 0.0, 3.0, -2.0, 0.0]);
    let init_objective = {
        let params = xrt_core::frame::params_from_se3(&init_pose);
        pipeline.evaluate(&params).unwrap()
    };

    let bounds = vec![
        [-0.5, 0.5],
        [-0.5, 0.5],
        [-0.5, 0.5],
        [-10.0, 10.0],
        [-10.0, 10.0],
        [-10.0, 10.0],
    ];
    let result = pipeline
        .register(&init_pose, Some(bounds), Tolerances::default())
        .unwrap();

    assert!(matches!(
        result.status,
        OptStatus::Converged | OptStatus::IterationLimit
    ));
    assert!(
        result.objective <= init_objective,
        "objective {} worse than initial {}",
        result.objective,
        init_objective
    );
    // The recovered pose is closer to the truth than the starting offset.
    assert!(trans_mag(&result.pose) < trans_mag(&init_pose));
}

#[test]
fn test_register_at_truth_terminates_quickly() {
    let true_pose = FrameTransform::identity();
    let fixed = render_fixed(&true_pose);

    let projector = PointSplatProjector::new(test_cams(), test_points(), Default::default());
    let mut pipeline = IntensityRegi2D3D::new(projector, grad_ncc_metrics(2), fixed).unwrap();
    pipeline.set_max_iters(200);

    let result = pipeline
        .register(&true_pose, None, Tolerances::default())
        .unwrap();

    assert!(matches!(
        result.status,
        OptStatus::Converged | OptStatus::IterationLimit
    ));
    // Starting at the truth, the search cannot move to a worse pose.
    assert!(trans_mag(&result.pose) < 1.0);
}

#[test]
fn test_pipeline_from_proj_data_records() {
    let mut render = PointSplatProjector::<B>::new(test_cams(), test_points(), Default::default());

    let records = test_cams()
        .into_iter()
        .enumerate()
        .map(|(view, cam)| {
            let tensor = render.project(view, &FrameTransform::identity()).unwrap();
            let pixels = tensor
                .to_data()
                .as_slice::<f32>()
                .expect("render is f32")
                .to_vec();
            let img = Image::from_pixels(48, 48, [1.0, 1.0], [0.0, 0.0], pixels)
                .expect("48x48 render");

            ProjData {
                img: Some(img),
                cam,
                landmarks: Default::default(),
            }
        })
        .collect::<Vec<_>>();

    let projector = PointSplatProjector::<B>::new(test_cams(), test_points(), Default::default());
    let mut pipeline = IntensityRegi2D3D::with_proj_data(
        projector,
        grad_ncc_metrics(2),
        &records,
        &Default::default(),
    )
    .unwrap();

    let at_truth = pipeline.evaluate(&[0.0; 6]).unwrap();
    let offset = pipeline.evaluate(&[0.0, 0.0, 0.0, 5.0, 0.0, 0.0]).unwrap();
    assert!(at_truth < offset);
}

#[test]
fn test_pipeline_rejects_metadata_only_records() {
    let records = test_cams()
        .into_iter()
        .map(|cam| ProjData::<f32> {
            img: None,
            cam,
            landmarks: Default::default(),
        })
        .collect::<Vec<_>>();

    let projector = PointSplatProjector::<B>::new(test_cams(), test_points(), Default::default());
    let result = IntensityRegi2D3D::with_proj_data(
        projector,
        grad_ncc_metrics(2),
        &records,
        &Default::default(),
    );

    assert!(matches!(result, Err(RegiError::InvalidState(_))));
}

#[test]
fn test_plain_ncc_pipeline_scores_truth_best() {
    let fixed = render_fixed(&FrameTransform::identity());

    let projector = PointSplatProjector::new(test_cams(), test_points(), Default::default());
    let metrics = (0..2)
        .map(|_| Box::new(NccSimMetric::<B>::new(Default::default())) as Box<dyn ImgSimMetric<B>>)
        .collect();
    let mut pipeline = IntensityRegi2D3D::new(projector, metrics, fixed).unwrap();

    let at_truth = pipeline.evaluate(&[0.0; 6]).unwrap();

    for offset in [
        [0.1, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 4.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, -4.0, 0.0],
    ] {
        let away = pipeline.evaluate(&offset).unwrap();
        assert!(at_truth < away, "{at_truth} not below {away} at {offset:?}");
    }
}
