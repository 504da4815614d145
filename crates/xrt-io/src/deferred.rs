//! Deferred, optionally cached, per-view pixel reads.
//!
//! Multi-view stores can hold dozens of high-resolution images of which a
//! registration run touches only a few; the reader therefore loads camera
//! models and landmarks for every view up front and decodes pixel
//! payloads one view at a time on demand. The opened container is held in
//! memory, so the origin file is read exactly once, at construction.

use std::path::{Path, PathBuf};

use tracing::debug;

use xrt_core::image::{Image, PixelScalar};

use crate::container::{ContainerFile, Group};
use crate::error::{Result, StoreError};
use crate::proj_data::{
    cast_proj_data, read_proj_data, read_single_img, ProjData, ProjDataF32, ProjDataU16,
    ProjDataU8,
};

/// Lazily decodes per-view images from a persisted projection store.
///
/// One materialized projection list is kept per pixel representation.
/// With caching enabled, a view's image is decoded at most once per
/// representation and then served from the in-memory list; with caching
/// disabled every read re-decodes and the in-memory lists are never
/// mutated.
///
/// Reads are `&mut self`; a reader shared between threads needs external
/// serialization around the cache.
pub struct DeferredProjReader {
    orig_path: PathBuf,
    store: ContainerFile,
    cache_imgs: bool,
    proj_data_f32: Vec<ProjDataF32>,
    proj_data_u16: Vec<ProjDataU16>,
    proj_data_u8: Vec<ProjDataU8>,
}

impl DeferredProjReader {
    /// Open a persisted store, reading cameras and landmarks for every
    /// view but decoding no pixel payloads.
    pub fn new(path: impl AsRef<Path>, cache_imgs: bool) -> Result<Self> {
        let orig_path = path.as_ref().to_path_buf();

        let store = ContainerFile::open(&orig_path)?;
        let proj_data_f32 = read_proj_data::<f32>(store.root(), false)?;

        // The other representations share the same cameras and landmarks;
        // derive them instead of re-reading the store.
        let proj_data_u16 = cast_proj_data(&proj_data_f32);
        let proj_data_u8 = cast_proj_data(&proj_data_f32);

        debug!(
            path = %orig_path.display(),
            num_projs = proj_data_f32.len(),
            cache_imgs,
            "opened deferred projection reader"
        );

        Ok(Self {
            orig_path,
            store,
            cache_imgs,
            proj_data_f32,
            proj_data_u16,
            proj_data_u8,
        })
    }

    pub fn num_projs(&self) -> usize {
        self.proj_data_f32.len()
    }

    pub fn cache_imgs(&self) -> bool {
        self.cache_imgs
    }

    /// Path the store was opened from.
    pub fn orig_path(&self) -> &Path {
        &self.orig_path
    }

    /// The f32 store as materialized so far.
    pub fn proj_data_f32(&self) -> &[ProjDataF32] {
        &self.proj_data_f32
    }

    /// The u16 store as materialized so far.
    pub fn proj_data_u16(&self) -> &[ProjDataU16] {
        &self.proj_data_u16
    }

    /// The u8 store as materialized so far.
    pub fn proj_data_u8(&self) -> &[ProjDataU8] {
        &self.proj_data_u8
    }

    /// Read one view's image as f32 pixels.
    pub fn read_proj_f32(&mut self, proj_idx: usize) -> Result<Image<f32>> {
        read_proj(&mut self.proj_data_f32, proj_idx, self.store.root(), self.cache_imgs)
    }

    /// Read one view's image as u16 pixels.
    pub fn read_proj_u16(&mut self, proj_idx: usize) -> Result<Image<u16>> {
        read_proj(&mut self.proj_data_u16, proj_idx, self.store.root(), self.cache_imgs)
    }

    /// Read one view's image as u8 pixels.
    pub fn read_proj_u8(&mut self, proj_idx: usize) -> Result<Image<u8>> {
        read_proj(&mut self.proj_data_u8, proj_idx, self.store.root(), self.cache_imgs)
    }
}

fn read_proj<P: PixelScalar>(
    pd: &mut [ProjData<P>],
    proj_idx: usize,
    root: &Group,
    cache_imgs: bool,
) -> Result<Image<P>> {
    let num_projs = pd.len();

    let record = pd.get_mut(proj_idx).ok_or(StoreError::OutOfRange {
        index: proj_idx,
        num_projs,
    })?;

    if cache_imgs {
        if record.img.is_none() {
            debug!(proj_idx, "cache miss, decoding view from store");
            record.img = Some(read_single_img::<P>(root, proj_idx)?);
        }

        // Serve the cached copy; the payload is not decoded again for
        // this view.
        Ok(record.img.clone().expect("image cached above"))
    } else {
        read_single_img::<P>(root, proj_idx)
    }
}
