//! Error types for projection-data storage.

use thiserror::Error;

/// Errors raised by the container format and proj-data IO.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    /// Absent optional substructure is detected through this variant and
    /// only this variant; any other read failure propagates.
    #[error("group not found: {name}")]
    GroupNotFound { name: String },

    #[error("dataset not found: {name}")]
    DatasetNotFound { name: String },

    #[error("attribute not found: {name}")]
    AttrNotFound { name: String },

    #[error("type mismatch at {name}: expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("projection index {index} out of range ({num_projs} projections)")]
    OutOfRange { index: usize, num_projs: usize },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }
}
