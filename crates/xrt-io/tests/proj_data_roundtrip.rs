use nalgebra::Point2;
use tempfile::tempdir;

use xrt_core::camera::CameraModel;
use xrt_core::frame::se3_from_params;
use xrt_core::image::Image;
use xrt_io::{
    copy_proj_data, read_proj_data_from_disk, write_proj_data, write_proj_data_to_disk,
    ContainerFile, DeferredProjReader, ProjData,
};

fn ramp_image(rows: usize, cols: usize, offset: f32) -> Image<f32> {
    let pixels: Vec<f32> = (0..rows * cols).map(|i| i as f32 + offset).collect();
    Image::from_pixels(rows, cols, [0.25, 0.25], [0.0, 0.0], pixels).unwrap()
}

fn two_view_store() -> Vec<ProjData<f32>> {
    let cam_a = CameraModel::with_focal_len(
        1000.0,
        256,
        256,
        [0.2, 0.2],
        se3_from_params(&[0.0, 0.0, 0.0, 0.0, 0.0, 400.0]),
    );
    let cam_b = CameraModel::with_focal_len(
        1000.0,
        256,
        256,
        [0.2, 0.2],
        se3_from_params(&[0.0, std::f64::consts::FRAC_PI_2, 0.0, 0.0, 0.0, 400.0]),
    );

    let mut view_a = ProjData::with_img(cam_a, ramp_image(256, 256, 0.0));
    view_a
        .landmarks
        .insert("femur-head".to_string(), Point2::new(120.5, 88.25));
    view_a
        .landmarks
        .insert("ischial-spine".to_string(), Point2::new(30.0, 200.0));

    let view_b = ProjData::with_img(cam_b, ramp_image(256, 256, 1000.0));

    vec![view_a, view_b]
}

#[test]
fn roundtrip_preserves_cams_landmarks_and_pixels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    let projs = two_view_store();

    for compress in [false, true] {
        write_proj_data_to_disk(&projs, &path, compress).unwrap();
        let back = read_proj_data_from_disk::<f32>(&path, true).unwrap();

        assert_eq!(back.len(), 2);

        for (orig, read) in projs.iter().zip(back.iter()) {
            assert_eq!(read.img.as_ref().unwrap(), orig.img.as_ref().unwrap());
            assert_eq!(read.cam.num_rows, orig.cam.num_rows);
            assert!((read.cam.intrins - orig.cam.intrins).norm() < 1e-12);
            assert!(
                (read.cam.extrins.to_homogeneous() - orig.cam.extrins.to_homogeneous()).norm()
                    < 1e-10
            );
            assert_eq!(read.landmarks.len(), orig.landmarks.len());
            for (name, pt) in &orig.landmarks {
                let read_pt = read.landmarks[name];
                assert!((read_pt - *pt).norm() < 1e-12);
            }
        }
    }
}

#[test]
fn metadata_only_read_skips_pixels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, true).unwrap();

    let back = read_proj_data_from_disk::<f32>(&path, false).unwrap();

    assert_eq!(back.len(), 2);
    for view in &back {
        assert!(view.img.is_none());
        assert_eq!(view.cam.num_rows, 256);
        assert_eq!(view.cam.num_cols, 256);
    }
    assert_eq!(back[0].landmarks.len(), 2);
    assert!(back[1].landmarks.is_empty());
}

#[test]
fn deferred_reader_with_caching_materializes_views_on_demand() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, true).unwrap();

    let mut reader = DeferredProjReader::new(&path, true).unwrap();

    assert_eq!(reader.num_projs(), 2);
    assert!(reader.proj_data_f32().iter().all(|pd| pd.img.is_none()));

    let first = reader.read_proj_f32(0).unwrap();
    assert!(reader.proj_data_f32()[0].img.is_some());
    assert!(reader.proj_data_f32()[1].img.is_none());

    let second = reader.read_proj_f32(0).unwrap();
    assert_eq!(first, second);
}

#[test]
fn deferred_reader_serves_views_after_origin_is_removed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, true).unwrap();

    let mut reader = DeferredProjReader::new(&path, false).unwrap();

    // The origin file is read once at open; per-view reads decode from
    // the in-memory container.
    std::fs::remove_file(&path).unwrap();

    let img = reader.read_proj_f32(1).unwrap();
    assert_eq!(img.rows(), 256);
    assert!(reader.read_proj_f32(0).is_ok());
}

#[test]
fn deferred_reader_without_caching_never_mutates_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, false).unwrap();

    let mut reader = DeferredProjReader::new(&path, false).unwrap();

    for _ in 0..3 {
        let img = reader.read_proj_f32(1).unwrap();
        assert_eq!(img.rows(), 256);
        assert!(reader.proj_data_f32()[1].img.is_none());
    }
}

#[test]
fn deferred_reader_casts_metadata_across_representations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, true).unwrap();

    let mut reader = DeferredProjReader::new(&path, true).unwrap();

    assert_eq!(reader.proj_data_u16().len(), 2);
    assert_eq!(reader.proj_data_u8()[0].landmarks.len(), 2);
    assert_eq!(
        reader.proj_data_u16()[1].cam.num_cols,
        reader.proj_data_f32()[1].cam.num_cols
    );

    // Pixel reads in an integer representation cast the stored floats.
    let img = reader.read_proj_u8(0).unwrap();
    assert_eq!(img.pixels()[0], 0u8);
    assert_eq!(img.pixels()[255], 255u8);
}

#[test]
fn deferred_reader_out_of_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pd.xrt");

    write_proj_data_to_disk(&two_view_store(), &path, false).unwrap();

    let mut reader = DeferredProjReader::new(&path, true).unwrap();
    assert!(reader.read_proj_f32(2).is_err());
}

#[test]
fn copy_without_decode_roundtrips() {
    let dir = tempdir().unwrap();
    let src_path = dir.path().join("src.xrt");
    let dst_path = dir.path().join("dst.xrt");

    let projs = two_view_store();
    write_proj_data_to_disk(&projs, &src_path, true).unwrap();

    let src = ContainerFile::open(&src_path).unwrap();

    let mut dst = ContainerFile::create();
    copy_proj_data(src.root(), dst.root_mut()).unwrap();
    dst.save(&dst_path).unwrap();

    let back = read_proj_data_from_disk::<f32>(&dst_path, true).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].img.as_ref().unwrap(), projs[0].img.as_ref().unwrap());
    assert_eq!(back[1].img.as_ref().unwrap(), projs[1].img.as_ref().unwrap());
}

#[test]
fn single_record_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.xrt");

    let projs = two_view_store();

    let mut file = ContainerFile::create();
    write_proj_data(&projs[..1], file.root_mut(), true).unwrap();
    file.save(&path).unwrap();

    let back = read_proj_data_from_disk::<f32>(&path, true).unwrap();
    assert_eq!(back.len(), 1);
    assert!(back[0].img.is_some());
}
