// src/lib.rs
//
// Lane boundary tracking and fitting on bird's-eye binary masks.
//
// Signal flow:
//   BinaryMask → window_search → PixelCluster per side
//              → polyfit → raw fits (pixel + world units)
//              → LaneTrack::update (left, right) → smoothed fits
//              → metrics → radius of curvature / vehicle offset
//   orchestrated per frame by pipeline::LanePipeline.
//
// The crate consumes a ready-made top-down binary mask; camera calibration,
// thresholding, perspective warping, and video I/O are external
// collaborators. One LanePipeline per stream; sessions are fully isolated.

pub mod config;
pub mod error;
pub mod lane_track;
pub mod metrics;
pub mod pipeline;
pub mod polyfit;
pub mod types;
pub mod window_search;

// Re-exports for ergonomic access
pub use config::{SearchConfig, TrackConfig, TrackerConfig};
pub use error::{LaneError, Result};
pub use lane_track::{LaneTrack, RejectReason, UpdateOutcome};
pub use pipeline::{FrameReport, LanePipeline, LaneReport, LaneStatus};
pub use polyfit::LaneFit;
pub use types::{BinaryMask, LaneSide, PixelCluster, QuadraticFit};
