pub mod geometry;
pub mod types;

pub use geometry::{Point, Rect};
pub use types::{OcrCandidate, RegionId, RegionStatus, SurfaceInfo, WatchEvent};
