pub mod container;
pub mod deferred;
pub mod error;
pub mod proj_data;

pub use container::{ContainerFile, Group};
pub use deferred::DeferredProjReader;
pub use error::{Result, StoreError};
pub use proj_data::{
    cast_proj_data, copy_proj_data, copy_proj_data_to_disk, read_proj_data,
    read_proj_data_from_disk, read_single_img,
    read_single_img_from_disk, write_proj_data, write_proj_data_to_disk, ProjData, ProjDataF32,
    ProjDataU16, ProjDataU8,
};
