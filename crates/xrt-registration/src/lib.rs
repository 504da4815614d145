pub mod error;
pub mod metric;
pub mod optimizer;
pub mod penalty;
pub mod pipeline;
pub mod projector;

pub use error::{RegiError, Result};
pub use metric::{GradNccSimMetric, ImgSimMetric, NccSimMetric};
pub use optimizer::{NelderMead, OptStatus, Optimizer, OptimizerResult, Tolerances};
pub use penalty::{PenaltyContext, PenaltyFn, Se3MagPenalty};
pub use pipeline::{IntensityRegi2D3D, PenaltySetup, RegiResult};
pub use projector::{PointSplatProjector, Projector};
