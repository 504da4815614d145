//! Reading and writing multi-view projection data.
//!
//! A projection dataset is persisted as a tagged group holding a
//! `num-projs` scalar and one `proj-NNN` subgroup per view. Each view
//! group contains a required `cam` subgroup, an optional `img` subgroup,
//! and an optional `landmarks` subgroup with one named 2D point per
//! landmark. Zero-padded view names keep lexicographic child order equal
//! to view order.

use std::collections::HashMap;
use std::path::Path;

use nalgebra::{Matrix3, Matrix4, Point2, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::debug;

use xrt_core::camera::CameraModel;
use xrt_core::frame::FrameTransform;
use xrt_core::image::{Image, PixelScalar};

use crate::container::{ContainerFile, Group};
use crate::error::{Result, StoreError};

const PROJ_DATA_TYPE_ATTR: &str = "xrt-proj-data";

/// One 2D view: pixels (possibly not yet materialized), camera geometry,
/// and named 2D landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjData<P> {
    /// Absent only inside a deferred/lazy read context.
    pub img: Option<Image<P>>,
    pub cam: CameraModel,
    pub landmarks: HashMap<String, Point2<f64>>,
}

impl<P> ProjData<P> {
    pub fn new(cam: CameraModel) -> Self {
        Self {
            img: None,
            cam,
            landmarks: HashMap::new(),
        }
    }

    pub fn with_img(cam: CameraModel, img: Image<P>) -> Self {
        Self {
            img: Some(img),
            cam,
            landmarks: HashMap::new(),
        }
    }
}

pub type ProjDataF32 = ProjData<f32>;
pub type ProjDataU16 = ProjData<u16>;
pub type ProjDataU8 = ProjData<u8>;

fn proj_group_name(idx: usize) -> String {
    format!("proj-{idx:03}")
}

fn write_cam_model(cam: &CameraModel, g: &mut Group) {
    g.write_matrix("intrinsic", 3, 3, cam.intrins.transpose().as_slice().to_vec());
    g.write_matrix(
        "extrinsic",
        4,
        4,
        cam.extrins.to_homogeneous().transpose().as_slice().to_vec(),
    );
    g.write_scalar("num-rows", cam.num_rows as u64);
    g.write_scalar("num-cols", cam.num_cols as u64);
    g.write_point("pixel-spacing", cam.pixel_spacing);
}

fn read_cam_model(g: &Group) -> Result<CameraModel> {
    let intrins_m = g.read_matrix("intrinsic")?;
    if intrins_m.rows != 3 || intrins_m.cols != 3 {
        return Err(StoreError::codec("camera intrinsic matrix must be 3x3"));
    }
    let intrins = Matrix3::from_row_slice(&intrins_m.data);

    let extrins_m = g.read_matrix("extrinsic")?;
    if extrins_m.rows != 4 || extrins_m.cols != 4 {
        return Err(StoreError::codec("camera extrinsic matrix must be 4x4"));
    }
    let homog = Matrix4::from_row_slice(&extrins_m.data);

    let rot_block = homog.fixed_view::<3, 3>(0, 0).into_owned();
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot_block));
    let trans = Vector3::new(homog[(0, 3)], homog[(1, 3)], homog[(2, 3)]);
    let extrins = FrameTransform::from_parts(Translation3::from(trans), rot);

    let spacing = g.read_point("pixel-spacing")?;

    Ok(CameraModel {
        intrins,
        extrins,
        num_rows: g.read_scalar("num-rows")? as usize,
        num_cols: g.read_scalar("num-cols")? as usize,
        pixel_spacing: spacing,
    })
}

/// Write a list of projections into a container group.
pub fn write_proj_data<P: PixelScalar>(
    projs: &[ProjData<P>],
    g: &mut Group,
    compress: bool,
) -> Result<()> {
    g.set_str_attr("xrt-type", PROJ_DATA_TYPE_ATTR);
    g.write_scalar("num-projs", projs.len() as u64);

    for (i, proj) in projs.iter().enumerate() {
        let proj_g = g.create_group(&proj_group_name(i));

        // Only persist the image when it has been materialized.
        if let Some(img) = &proj.img {
            let img_g = proj_g.create_group("img");
            img_g.write_image("pixels", img, compress)?;
        }

        let cam_g = proj_g.create_group("cam");
        write_cam_model(&proj.cam, cam_g);

        if !proj.landmarks.is_empty() {
            let lands_g = proj_g.create_group("landmarks");
            for (name, pt) in &proj.landmarks {
                lands_g.write_point(name, [pt.x, pt.y]);
            }
        }
    }

    Ok(())
}

/// Read a list of projections from a container group.
///
/// With `read_pixels` false only cameras and landmarks are decoded, which
/// bounds the cost to metadata regardless of image resolution. An absent
/// `landmarks` group is an empty landmark map; any other landmark read
/// failure propagates.
pub fn read_proj_data<P: PixelScalar>(g: &Group, read_pixels: bool) -> Result<Vec<ProjData<P>>> {
    let num_projs = g.read_scalar("num-projs")? as usize;

    debug!(num_projs, read_pixels, "reading projection data");

    let mut projs = Vec::with_capacity(num_projs);

    for i in 0..num_projs {
        let proj_g = g.group(&proj_group_name(i))?;

        let cam = read_cam_model(proj_g.group("cam")?)?;

        let img = if read_pixels {
            match proj_g.group("img") {
                Ok(img_g) => Some(img_g.read_image::<P>("pixels")?),
                Err(StoreError::GroupNotFound { .. }) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let landmarks = match proj_g.group("landmarks") {
            Ok(lands_g) => {
                let mut m = HashMap::new();
                for name in lands_g.point_names() {
                    let pt = lands_g.read_point(name)?;
                    m.insert(name.to_string(), Point2::new(pt[0], pt[1]));
                }
                m
            }
            Err(StoreError::GroupNotFound { .. }) => HashMap::new(),
            Err(e) => return Err(e),
        };

        projs.push(ProjData { img, cam, landmarks });
    }

    Ok(projs)
}

/// Read the pixel payload of a single view, decoding nothing else.
pub fn read_single_img<P: PixelScalar>(g: &Group, proj_idx: usize) -> Result<Image<P>> {
    let num_projs = g.read_scalar("num-projs")? as usize;

    if proj_idx >= num_projs {
        return Err(StoreError::OutOfRange {
            index: proj_idx,
            num_projs,
        });
    }

    g.group(&proj_group_name(proj_idx))?
        .group("img")?
        .read_image::<P>("pixels")
}

/// Copy an entire projection dataset between groups without decoding any
/// image payloads.
pub fn copy_proj_data(src: &Group, dst: &mut Group) -> Result<()> {
    dst.set_str_attr("xrt-type", PROJ_DATA_TYPE_ATTR);
    dst.copy_attr_from(src, "num-projs")?;

    let num_projs = src.read_scalar("num-projs")? as usize;

    for i in 0..num_projs {
        dst.copy_child_from(src, &proj_group_name(i))?;
    }

    Ok(())
}

/// Cast a projection list to another pixel representation.
///
/// Cameras and landmarks carry over; images are dropped rather than
/// converted, since the target-representation pixels are re-read (or
/// cast) on demand by the deferred reader.
pub fn cast_proj_data<Q, P>(src: &[ProjData<P>]) -> Vec<ProjData<Q>> {
    src.iter()
        .map(|pd| ProjData {
            img: None,
            cam: pd.cam.clone(),
            landmarks: pd.landmarks.clone(),
        })
        .collect()
}

/// Write a projection list to a new container file on disk.
pub fn write_proj_data_to_disk<P: PixelScalar>(
    projs: &[ProjData<P>],
    path: impl AsRef<Path>,
    compress: bool,
) -> Result<()> {
    let mut file = ContainerFile::create();
    write_proj_data(projs, file.root_mut(), compress)?;
    file.save(path)
}

/// Read a projection list from a container file on disk.
pub fn read_proj_data_from_disk<P: PixelScalar>(
    path: impl AsRef<Path>,
    read_pixels: bool,
) -> Result<Vec<ProjData<P>>> {
    let file = ContainerFile::open(path)?;
    read_proj_data(file.root(), read_pixels)
}

/// Read a single view's pixel payload from a container file on disk.
pub fn read_single_img_from_disk<P: PixelScalar>(
    path: impl AsRef<Path>,
    proj_idx: usize,
) -> Result<Image<P>> {
    let file = ContainerFile::open(path)?;
    read_single_img(file.root(), proj_idx)
}

/// Copy a projection dataset out of an open container into a new file on
/// disk, without decoding any pixels.
pub fn copy_proj_data_to_disk(src: &Group, path: impl AsRef<Path>) -> Result<()> {
    let mut dst = ContainerFile::create();
    copy_proj_data(src, dst.root_mut())?;
    dst.save(path)
}
