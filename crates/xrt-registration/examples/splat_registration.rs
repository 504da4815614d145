//! Registers a small synthetic point model against two splat-rendered
//! views, starting from a deliberately offset pose.
//!
//! Run with `cargo run --example splat_registration`.

use anyhow::Result;
use burn_ndarray::NdArray;
use nalgebra::Point3;

use xrt_core::camera::CameraModel;
use xrt_core::frame::{params_from_se3, se3_from_params, rot_mag, trans_mag, FrameTransform};
use xrt_registration::{
    GradNccSimMetric, ImgSimMetric, IntensityRegi2D3D, PointSplatProjector, Projector, Tolerances,
};

type B = NdArray<f32>;

fn cams() -> Vec<CameraModel> {
    let frontal = se3_from_params(&[0.0, 0.0, 0.0, 0.0, 0.0, 150.0]);
    let lateral = se3_from_params(&[0.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0, 150.0]);
    vec![
        CameraModel::with_focal_len(80.0, 64, 64, [1.0, 1.0], frontal),
        CameraModel::with_focal_len(80.0, 64, 64, [1.0, 1.0], lateral),
    ]
}

fn model_points() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(12.0, 0.0, 0.0),
        Point3::new(0.0, 12.0, 0.0),
        Point3::new(0.0, 0.0, 12.0),
        Point3::new(-8.0, 5.0, -4.0),
        Point3::new(6.0, -9.0, 7.0),
        Point3::new(-3.0, -3.0, 10.0),
    ]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();
    let true_pose = FrameTransform::identity();

    // The "acquired" views are renders at the true pose.
    let mut render = PointSplatProjector::<B>::new(cams(), model_points(), device);
    let fixed = (0..2)
        .map(|view| render.project(view, &true_pose))
        .collect::<Result<Vec<_>, _>>()?;

    let projector = PointSplatProjector::<B>::new(cams(), model_points(), Default::default());
    let metrics = (0..2)
        .map(|_| {
            Box::new(GradNccSimMetric::<B>::new(Default::default())) as Box<dyn ImgSimMetric<B>>
        })
        .collect();
    let mut pipeline = IntensityRegi2D3D::new(projector, metrics, fixed)?;

    let init_pose = se3_from_params(&[0.05, -0.03, 0.0, 4.0, -3.0, 2.0]);
    println!(
        "initial offset: rot {:.4} rad, trans {:.2} mm",
        rot_mag(&init_pose),
        trans_mag(&init_pose)
    );

    let bounds = vec![
        [-0.5, 0.5],
        [-0.5, 0.5],
        [-0.5, 0.5],
        [-15.0, 15.0],
        [-15.0, 15.0],
        [-15.0, 15.0],
    ];
    let result = pipeline.register(&init_pose, Some(bounds), Tolerances::default())?;

    println!(
        "finished: {:?} after {} iterations, objective {:.6}",
        result.status, result.iterations, result.objective
    );
    println!(
        "recovered pose residual: rot {:.4} rad, trans {:.2} mm",
        rot_mag(&result.pose),
        trans_mag(&result.pose)
    );
    println!("recovered params: {:?}", params_from_se3(&result.pose));

    Ok(())
}
