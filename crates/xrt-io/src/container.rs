//! Group/attribute container format for persisted projection stores.
//!
//! A store is a tree of named groups. Groups carry attributes (strings and
//! unsigned scalars) and datasets (images, 2D points, matrices). The whole
//! tree is serialized in one bincode blob per file; image pixel payloads
//! are raw byte datasets with optional deflate compression and are only
//! decoded when a consumer asks for them, which is what makes both
//! deferred per-view reads and copy-without-decode possible.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use xrt_core::image::{Image, PixelKind, PixelScalar};

use crate::error::{Result, StoreError};

/// A group attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attr {
    Str(String),
    UInt(u64),
}

/// An encoded image payload.
///
/// Pixels are stored as native-endian raw bytes of the tagged pixel kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub rows: usize,
    pub cols: usize,
    pub spacing: [f64; 2],
    pub origin: [f64; 2],
    pub dtype: PixelKind,
    pub compressed: bool,
    pub bytes: Vec<u8>,
}

/// A dense row-major matrix dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixPayload {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dataset {
    Image(ImagePayload),
    Point2([f64; 2]),
    Matrix(MatrixPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Group(Group),
    Dataset(Dataset),
}

/// A named collection of attributes, datasets, and subgroups.
///
/// Children are kept in a sorted map, so zero-padded child names
/// (`proj-000`, `proj-001`, ...) iterate in view order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    attrs: BTreeMap<String, Attr>,
    children: BTreeMap<String, Node>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a subgroup.
    ///
    /// An existing dataset child of the same name is replaced.
    pub fn create_group(&mut self, name: &str) -> &mut Group {
        let node = self.children.entry(name.to_string()).or_insert_with(|| Node::Group(Group::new()));

        if !matches!(node, Node::Group(_)) {
            *node = Node::Group(Group::new());
        }

        match node {
            Node::Group(g) => g,
            Node::Dataset(_) => unreachable!(),
        }
    }

    /// Open an existing subgroup.
    pub fn group(&self, name: &str) -> Result<&Group> {
        match self.children.get(name) {
            Some(Node::Group(g)) => Ok(g),
            Some(Node::Dataset(_)) => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: "group",
                found: "dataset",
            }),
            None => Err(StoreError::GroupNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Names of all child groups, in sorted order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|(name, node)| {
            matches!(node, Node::Group(_)).then_some(name.as_str())
        })
    }

    pub fn set_str_attr(&mut self, name: &str, val: &str) {
        self.attrs.insert(name.to_string(), Attr::Str(val.to_string()));
    }

    pub fn str_attr(&self, name: &str) -> Result<&str> {
        match self.attrs.get(name) {
            Some(Attr::Str(s)) => Ok(s),
            Some(Attr::UInt(_)) => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: "string attribute",
                found: "scalar attribute",
            }),
            None => Err(StoreError::AttrNotFound {
                name: name.to_string(),
            }),
        }
    }

    pub fn write_scalar(&mut self, name: &str, val: u64) {
        self.attrs.insert(name.to_string(), Attr::UInt(val));
    }

    pub fn read_scalar(&self, name: &str) -> Result<u64> {
        match self.attrs.get(name) {
            Some(Attr::UInt(v)) => Ok(*v),
            Some(Attr::Str(_)) => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: "scalar attribute",
                found: "string attribute",
            }),
            None => Err(StoreError::AttrNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Encode and store an image dataset.
    pub fn write_image<P: PixelScalar>(
        &mut self,
        name: &str,
        img: &Image<P>,
        compress: bool,
    ) -> Result<()> {
        let raw: &[u8] = bytemuck::cast_slice(img.pixels());

        let bytes = if compress {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(raw)?;
            enc.finish()?
        } else {
            raw.to_vec()
        };

        self.children.insert(
            name.to_string(),
            Node::Dataset(Dataset::Image(ImagePayload {
                rows: img.rows(),
                cols: img.cols(),
                spacing: img.spacing(),
                origin: img.origin(),
                dtype: P::KIND,
                compressed: compress,
                bytes,
            })),
        );

        Ok(())
    }

    /// Decode an image dataset into the requested pixel representation.
    ///
    /// A stored payload of a different pixel kind is decoded in its stored
    /// kind and then cast, so one stored image serves every representation.
    pub fn read_image<P: PixelScalar>(&self, name: &str) -> Result<Image<P>> {
        let payload = match self.children.get(name) {
            Some(Node::Dataset(Dataset::Image(p))) => p,
            Some(_) => {
                return Err(StoreError::TypeMismatch {
                    name: name.to_string(),
                    expected: "image dataset",
                    found: "other node",
                })
            }
            None => {
                return Err(StoreError::DatasetNotFound {
                    name: name.to_string(),
                })
            }
        };

        let raw = if payload.compressed {
            let mut dec = ZlibDecoder::new(payload.bytes.as_slice());
            let mut out = Vec::new();
            dec.read_to_end(&mut out)?;
            out
        } else {
            payload.bytes.clone()
        };

        let expected_len = payload.rows * payload.cols;

        let pixels: Vec<P> = match payload.dtype {
            PixelKind::F32 => cast_pixels::<f32, P>(&raw),
            PixelKind::U16 => cast_pixels::<u16, P>(&raw),
            PixelKind::U8 => cast_pixels::<u8, P>(&raw),
        };

        if pixels.len() != expected_len {
            return Err(StoreError::codec(format!(
                "image dataset {name}: expected {expected_len} pixels, decoded {}",
                pixels.len()
            )));
        }

        Image::from_pixels(
            payload.rows,
            payload.cols,
            payload.spacing,
            payload.origin,
            pixels,
        )
        .ok_or_else(|| StoreError::codec(format!("image dataset {name}: inconsistent dimensions")))
    }

    pub fn write_point(&mut self, name: &str, pt: [f64; 2]) {
        self.children
            .insert(name.to_string(), Node::Dataset(Dataset::Point2(pt)));
    }

    pub fn read_point(&self, name: &str) -> Result<[f64; 2]> {
        match self.children.get(name) {
            Some(Node::Dataset(Dataset::Point2(pt))) => Ok(*pt),
            Some(_) => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: "point dataset",
                found: "other node",
            }),
            None => Err(StoreError::DatasetNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Names of all point datasets, in sorted order.
    pub fn point_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|(name, node)| {
            matches!(node, Node::Dataset(Dataset::Point2(_))).then_some(name.as_str())
        })
    }

    pub fn write_matrix(&mut self, name: &str, rows: usize, cols: usize, data: Vec<f64>) {
        self.children.insert(
            name.to_string(),
            Node::Dataset(Dataset::Matrix(MatrixPayload { rows, cols, data })),
        );
    }

    /// Read a matrix dataset, validating the tagged dimensions against the
    /// stored value count.
    pub fn read_matrix(&self, name: &str) -> Result<&MatrixPayload> {
        match self.children.get(name) {
            Some(Node::Dataset(Dataset::Matrix(m))) => {
                if m.data.len() != m.rows * m.cols {
                    return Err(StoreError::codec(format!(
                        "matrix dataset {name}: tagged {}x{} but {} values stored",
                        m.rows,
                        m.cols,
                        m.data.len()
                    )));
                }
                Ok(m)
            }
            Some(_) => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: "matrix dataset",
                found: "other node",
            }),
            None => Err(StoreError::DatasetNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Copy a child node from another group, keeping encoded payloads
    /// encoded. This is the copy-without-decode primitive used to duplicate
    /// whole projection datasets.
    pub fn copy_child_from(&mut self, src: &Group, name: &str) -> Result<()> {
        let node = src
            .children
            .get(name)
            .ok_or_else(|| StoreError::GroupNotFound {
                name: name.to_string(),
            })?;

        self.children.insert(name.to_string(), node.clone());
        Ok(())
    }

    /// Copy an attribute from another group.
    pub fn copy_attr_from(&mut self, src: &Group, name: &str) -> Result<()> {
        let attr = src.attrs.get(name).ok_or_else(|| StoreError::AttrNotFound {
            name: name.to_string(),
        })?;

        self.attrs.insert(name.to_string(), attr.clone());
        Ok(())
    }
}

/// A container persisted as one file.
#[derive(Debug, Clone, Default)]
pub struct ContainerFile {
    root: Group,
}

impl ContainerFile {
    /// An empty container.
    pub fn create() -> Self {
        Self::default()
    }

    /// Read a container from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let root = bincode::deserialize(&bytes)
            .map_err(|e| StoreError::codec(format!("container decode: {e}")))?;

        Ok(Self { root })
    }

    /// Write the container to disk, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = bincode::serialize(&self.root)
            .map_err(|e| StoreError::codec(format!("container encode: {e}")))?;

        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }
}

fn cast_pixels<S: PixelScalar, P: PixelScalar>(raw: &[u8]) -> Vec<P> {
    if S::KIND == P::KIND {
        // Same representation; reinterpret the buffer without conversion.
        bytemuck::pod_collect_to_vec(raw)
    } else {
        let stored: Vec<S> = bytemuck::pod_collect_to_vec(raw);
        stored.iter().map(|s| P::from_f32(s.to_f32())).collect()
    }
}
