pub mod camera;
pub mod dist;
pub mod frame;
pub mod gradient;
pub mod image;

pub use camera::CameraModel;
pub use dist::{Dist, DistPtr, NormalDist};
pub use frame::FrameTransform;
pub use image::{Image, PixelKind, PixelScalar};
