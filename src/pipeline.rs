// src/pipeline.rs
//
// Per-frame orchestration for one tracking session.
//
// Signal flow per frame:
//   BinaryMask → window_search → PixelCluster per side
//             → polyfit (pixel + world units)
//             → LaneTrack::update per side (accept / reject / seed)
//             → metrics (radius of curvature, vehicle offset)
//             → FrameReport (fill polygon + metrics + per-side diagnostics)
//
// One LanePipeline owns the two LaneTrack instances for its session, so
// independent sessions (concurrent streams) are fully isolated: no shared or
// process-wide state. Frames of one session must be fed strictly in temporal
// order; each update depends on the previous frame's smoothed estimate.

use crate::config::TrackerConfig;
use crate::error::{LaneError, Result};
use crate::lane_track::{LaneTrack, UpdateOutcome};
use crate::metrics;
use crate::polyfit::{self, MIN_FIT_POINTS};
use crate::types::{BinaryMask, LaneSide, PixelCluster, QuadraticFit};
use crate::window_search::{self, SearchOutput};
use tracing::debug;

/// Validation row for the right boundary's base-position test, in mask
/// pixels. The left boundary validates at the mask's own bottom row
/// (`height - 1`). The two coincide only for 720-row masks; they are kept as
/// separate named values rather than silently unified.
const RIGHT_VALIDATION_ROW: f64 = 719.0;

/// How one side's fit resolved this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneStatus {
    /// First fit of the session, accepted without validation.
    Seeded,
    /// Fit passed the acceptance gate and entered the history.
    Accepted,
    /// Fit failed validation; the smoothed estimate is reported instead.
    Rejected,
    /// No usable fit this frame (too few pixels or degenerate geometry);
    /// the smoothed estimate from prior frames is reported.
    FitFailed,
}

impl LaneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeded => "seeded",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::FitFailed => "fit_failed",
        }
    }
}

/// Per-side output for one frame.
#[derive(Debug, Clone)]
pub struct LaneReport {
    pub side: LaneSide,
    pub status: LaneStatus,
    /// Outcome of the latest acceptance test.
    pub detected: bool,
    /// History-smoothed pixel-space fit — the trusted estimate.
    pub smoothed_fit: QuadraticFit,
    /// This frame's raw fit, when one could be computed.
    pub raw_fit: Option<QuadraticFit>,
    /// Radius of curvature in meters; `f64::INFINITY` for a straight lane.
    pub radius_m: f64,
    /// Final reported base position: the per-frame vehicle offset, same
    /// value on both sides. Distinct from the tracker-internal validation
    /// signal.
    pub line_base_position_m: f64,
    /// On-pixels associated to this side this frame.
    pub pixels: usize,
}

/// Full output of one processed frame.
///
/// `unwarp` is the caller's inverse-perspective handle, carried through
/// untouched for the external unwarp + overlay stage; the core never
/// inspects it.
#[derive(Debug, Clone)]
pub struct FrameReport<U> {
    pub frame_index: u64,
    pub left: LaneReport,
    pub right: LaneReport,
    /// Signed lateral vehicle offset in meters; negative = left of center.
    pub offset_m: f64,
    /// Fill polygon between the two smoothed curves in top-down
    /// coordinates: left boundary top→bottom, then right boundary
    /// bottom→top.
    pub polygon: Vec<(f64, f64)>,
    pub unwarp: U,
}

/// One lane-tracking session: configuration plus both boundary trackers.
pub struct LanePipeline {
    cfg: TrackerConfig,
    left: LaneTrack,
    right: LaneTrack,
    frame_index: u64,
}

impl LanePipeline {
    pub fn new(cfg: TrackerConfig) -> Self {
        let left = LaneTrack::new(
            LaneSide::Left,
            cfg.track,
            cfg.image_center_x,
            cfg.xm_per_pix,
        );
        let right = LaneTrack::new(
            LaneSide::Right,
            cfg.track,
            cfg.image_center_x,
            cfg.xm_per_pix,
        );
        Self {
            cfg,
            left,
            right,
            frame_index: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.cfg
    }

    /// Read access to a side's tracker, e.g. for drawing search windows or
    /// the retained pixel clusters.
    pub fn track(&self, side: LaneSide) -> &LaneTrack {
        match side {
            LaneSide::Left => &self.left,
            LaneSide::Right => &self.right,
        }
    }

    /// Explicit session restart; the only way tracker state clears
    /// mid-process.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.frame_index = 0;
    }

    /// Process one top-down binary mask.
    ///
    /// Transient fit problems on a side with history degrade silently to the
    /// smoothed estimate. The call fails only when the mask shape is wrong
    /// or a side has never produced a fit — there is no safe geometry to
    /// report then.
    pub fn process_frame<U>(&mut self, mask: &BinaryMask, unwarp: U) -> Result<FrameReport<U>> {
        if mask.width() != self.cfg.image_width || mask.height() != self.cfg.image_height {
            return Err(LaneError::MaskShape {
                width: self.cfg.image_width,
                height: self.cfg.image_height,
                got: mask.as_bytes().len(),
            });
        }

        let frame_index = self.frame_index;
        self.frame_index += 1;

        // Associate pixels per side: the full sliding-window sweep is only
        // run when a side has no prior fit to search around (or the
        // targeted corridor came up short), and at most once per frame.
        let mut sweep: Option<SearchOutput> = None;
        let left_cluster = side_cluster(&self.left, &self.cfg, mask, &mut sweep);
        let right_cluster = side_cluster(&self.right, &self.cfg, mask, &mut sweep);

        // The left boundary validates at the mask's bottom row; the right
        // at RIGHT_VALIDATION_ROW. See the constant above.
        let left = update_side(
            &mut self.left,
            &self.cfg,
            left_cluster,
            self.cfg.bottom_row(),
        )?;
        let right = update_side(&mut self.right, &self.cfg, right_cluster, RIGHT_VALIDATION_ROW)?;

        // Reported offset comes from the most recent per-side estimates at
        // the bottom row, and is assigned to both tracks as their reported
        // base position.
        let left_now = self.left.current_fit().unwrap_or(left.smoothed_fit);
        let right_now = self.right.current_fit().unwrap_or(right.smoothed_fit);
        let offset_m = metrics::vehicle_offset(
            &left_now,
            &right_now,
            self.cfg.bottom_row(),
            self.cfg.image_center_x,
            self.cfg.xm_per_pix,
        );
        self.left.set_line_base_position_m(offset_m);
        self.right.set_line_base_position_m(offset_m);

        let polygon = lane_polygon(self.left.best_curve(), self.right.best_curve());

        debug!(
            "frame {}: left={} right={} offset={:.3}m",
            frame_index,
            left.status.as_str(),
            right.status.as_str(),
            offset_m
        );

        Ok(FrameReport {
            frame_index,
            left: LaneReport {
                line_base_position_m: offset_m,
                ..left
            },
            right: LaneReport {
                line_base_position_m: offset_m,
                ..right
            },
            offset_m,
            polygon,
            unwarp,
        })
    }
}

/// Pixel association for one side: targeted corridor search around the prior
/// smoothed fit when one exists, otherwise (or when the corridor cannot even
/// support a fit) the shared sliding-window sweep.
fn side_cluster(
    track: &LaneTrack,
    cfg: &TrackerConfig,
    mask: &BinaryMask,
    sweep: &mut Option<SearchOutput>,
) -> PixelCluster {
    if let Some(prior) = track.best_fit() {
        let cluster = window_search::search_around_fit(mask, &prior, cfg.search.margin);
        if cluster.len() >= MIN_FIT_POINTS {
            return cluster;
        }
        debug!(
            "{} targeted search found only {} pixels, falling back to window sweep",
            track.side(),
            cluster.len()
        );
    }
    let out = sweep.get_or_insert_with(|| window_search::sliding_window(mask, &cfg.search));
    match track.side() {
        LaneSide::Left => out.left.clone(),
        LaneSide::Right => out.right.clone(),
    }
}

/// Fit one side's cluster and run it through the tracker. Fit failures
/// degrade to the smoothed estimate; only a side with no estimate at all is
/// an error.
fn update_side(
    track: &mut LaneTrack,
    cfg: &TrackerConfig,
    cluster: PixelCluster,
    validation_row: f64,
) -> Result<LaneReport> {
    let pixels = cluster.len();

    let (status, raw_fit) =
        match polyfit::fit_cluster(&cluster, track.side(), cfg.xm_per_pix, cfg.ym_per_pix) {
            Ok(fit) => {
                let curve = fit.pixel.sample(cfg.image_height);
                let outcome = track.update(fit.pixel, curve, validation_row);
                if matches!(outcome, UpdateOutcome::Seeded | UpdateOutcome::Accepted) {
                    let y_bottom_m = cfg.bottom_row() * cfg.ym_per_pix;
                    track.set_radius_of_curvature_m(metrics::radius_of_curvature(
                        &fit.world, y_bottom_m,
                    ));
                }
                let status = match outcome {
                    UpdateOutcome::Seeded => LaneStatus::Seeded,
                    UpdateOutcome::Accepted => LaneStatus::Accepted,
                    UpdateOutcome::Rejected(_) => LaneStatus::Rejected,
                };
                (status, Some(fit.pixel))
            }
            Err(err) => {
                debug!("{} fit failed ({err}), holding prior estimate", track.side());
                track.note_missed_frame();
                (LaneStatus::FitFailed, None)
            }
        };

    // The raw cluster is kept even for rejected/failed frames so a
    // visualization layer can show what the search actually found.
    track.set_last_cluster(cluster);

    let smoothed_fit = track.best_fit().ok_or(LaneError::NoEstimate {
        side: track.side(),
    })?;

    Ok(LaneReport {
        side: track.side(),
        status,
        detected: track.detected(),
        smoothed_fit,
        raw_fit,
        radius_m: track.radius_of_curvature_m(),
        line_base_position_m: track.line_base_position_m(),
        pixels,
    })
}

/// Fill polygon between the two smoothed curves: down the left boundary,
/// back up the right.
fn lane_polygon(left_curve: &[f64], right_curve: &[f64]) -> Vec<(f64, f64)> {
    let mut polygon = Vec::with_capacity(left_curve.len() + right_curve.len());
    for (y, &x) in left_curve.iter().enumerate() {
        polygon.push((x, y as f64));
    }
    for (y, &x) in right_curve.iter().enumerate().rev() {
        polygon.push((x, y as f64));
    }
    polygon
}
