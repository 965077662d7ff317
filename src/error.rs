// src/error.rs

use crate::types::LaneSide;
use thiserror::Error;

/// Errors surfaced by the lane tracking core.
///
/// Per-frame fit problems are usually absorbed internally by falling back to
/// the history-smoothed estimate; they only reach the caller when there is no
/// history to fall back to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaneError {
    /// Fewer than three lane pixels were found for a side — a quadratic fit
    /// is not well-posed.
    #[error("not enough lane pixels on the {side} side: {count} found, 3 required")]
    InsufficientPixels { side: LaneSide, count: usize },

    /// The least-squares normal equations were singular (e.g. all pixels on
    /// one row). Treated the same as insufficient pixels by the pipeline.
    #[error("degenerate pixel geometry on the {side} side, cannot fit quadratic")]
    SingularFit { side: LaneSide },

    /// A side has no current fit AND no history to fall back to. There is no
    /// safe estimate to report; fabricating geometry here would be worse
    /// than failing.
    #[error("no lane estimate available for the {side} side")]
    NoEstimate { side: LaneSide },

    /// Mask buffer does not match the configured frame dimensions.
    #[error("mask shape mismatch: got {got} bytes for a {width}x{height} frame")]
    MaskShape {
        width: usize,
        height: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, LaneError>;
