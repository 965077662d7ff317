// src/lane_track.rs
//
// Cross-frame tracking state machine for one lane boundary.
//
// One LaneTrack instance lives per side per session and is mutated every
// frame. Conceptually two states:
//
//   Uninitialized (history empty) ──first fit──▶ Tracking (history non-empty)
//
// with no terminal state. In Tracking, every new fit passes a two-part
// acceptance gate before it may enter the bounded history:
//
//   1. |line base position| ≤ max_distance_m — the boundary must sit a
//      plausible lateral distance from the vehicle centerline;
//   2. relative curve distance < max_rel_fitx — the new sampled curve must
//      not stray too far from the smoothed curve.
//
// Accepted fits push into a FIFO history of capacity `history_len`; the
// smoothed estimate is the mean over the whole retained history. Rejected
// fits never touch the history, but the smoothed estimate is re-averaged
// over only the last `reject_avg_window` entries so that recovery after a
// reject streak is not anchored to stale data indefinitely. One bad frame
// (shadow, lane gap, passing vehicle) therefore cannot corrupt the estimate,
// while a genuine sustained change eventually pulls the view window along.

use crate::config::TrackConfig;
use crate::types::{LaneSide, PixelCluster, QuadraticFit};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Why a fit failed the acceptance gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// |line base position| exceeded `max_distance_m`.
    BaseDistance { base_m: f64 },
    /// Relative curve distance reached `max_rel_fitx`.
    CurveShape { rel_diff: f64 },
}

/// Outcome of one `update` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// History was empty; the fit was accepted unconditionally to seed the
    /// tracker — there is no prior estimate to validate against.
    Seeded,
    /// The fit passed validation and entered the history.
    Accepted,
    /// The fit failed validation; history is unchanged.
    Rejected(RejectReason),
}

/// Tracking state for one lane boundary.
pub struct LaneTrack {
    side: LaneSide,
    cfg: TrackConfig,
    /// Vehicle centerline x in mask pixels, for base-position validation.
    center_x_px: f64,
    /// Horizontal meters per pixel, for base-position validation.
    xm_per_pix: f64,

    /// Accepted (fit, sampled curve) pairs, oldest first. Never exceeds
    /// `cfg.history_len`; eviction happens only inside the accept push, so
    /// rejection can never underflow or shrink it.
    history: VecDeque<(QuadraticFit, Vec<f64>)>,

    best_fit: Option<QuadraticFit>,
    best_curve: Vec<f64>,
    /// Most recent accepted fit, or the smoothed fallback after a reject.
    current_fit: Option<QuadraticFit>,
    /// Outcome of the most recent acceptance test only. Independent of how
    /// much history exists.
    detected: bool,

    /// Signed lateral distance (m) of the latest candidate fit from the
    /// centerline — the validation signal. Distinct from the reported
    /// per-frame vehicle offset, which the orchestrator assigns separately.
    validation_base_m: f64,
    /// Final externally reported base position (m), written per frame by the
    /// orchestrator from the two-lane offset estimate.
    line_base_position_m: f64,
    radius_of_curvature_m: f64,

    /// Raw pixels from the latest frame, retained on accept AND reject for
    /// diagnostics/visualization.
    last_cluster: PixelCluster,

    consecutive_rejects: u32,
}

impl LaneTrack {
    pub fn new(side: LaneSide, cfg: TrackConfig, center_x_px: f64, xm_per_pix: f64) -> Self {
        Self {
            side,
            cfg,
            center_x_px,
            xm_per_pix,
            history: VecDeque::with_capacity(cfg.history_len),
            best_fit: None,
            best_curve: Vec::new(),
            current_fit: None,
            detected: false,
            validation_base_m: 0.0,
            line_base_position_m: 0.0,
            radius_of_curvature_m: f64::INFINITY,
            last_cluster: PixelCluster::default(),
            consecutive_rejects: 0,
        }
    }

    /// Feed this frame's raw fit and its sampled curve through the
    /// acceptance gate. `y_bottom_px` is the validation row for this side.
    pub fn update(
        &mut self,
        new_fit: QuadraticFit,
        new_curve: Vec<f64>,
        y_bottom_px: f64,
    ) -> UpdateOutcome {
        if self.history.is_empty() {
            // Seed without validation.
            self.best_fit = Some(new_fit);
            self.best_curve = new_curve.clone();
            self.current_fit = Some(new_fit);
            self.history.push_back((new_fit, new_curve));
            self.detected = true;
            self.consecutive_rejects = 0;
            debug!("{} tracker seeded with first fit", self.side);
            return UpdateOutcome::Seeded;
        }

        let base_m = (new_fit.eval(y_bottom_px) - self.center_x_px) * self.xm_per_pix;
        self.validation_base_m = base_m;

        let rel_diff = relative_curve_distance(&new_curve, &self.best_curve);

        if base_m.abs() > self.cfg.max_distance_m {
            return self.reject(RejectReason::BaseDistance { base_m });
        }
        if rel_diff >= self.cfg.max_rel_fitx {
            return self.reject(RejectReason::CurveShape { rel_diff });
        }

        self.accept(new_fit, new_curve, base_m, rel_diff)
    }

    /// No usable fit this frame (too few pixels or degenerate geometry).
    /// Behaves like a rejection: history untouched, smoothed estimate
    /// re-averaged over the recent window, `detected` cleared. With no
    /// history at all the track simply stays uninitialized.
    pub fn note_missed_frame(&mut self) {
        self.detected = false;
        if self.history.is_empty() {
            return;
        }
        self.consecutive_rejects += 1;
        self.refresh_best(self.cfg.reject_avg_window);
        self.current_fit = self.best_fit;
        debug!("{} has no fit this frame, holding smoothed estimate", self.side);
    }

    fn accept(
        &mut self,
        new_fit: QuadraticFit,
        new_curve: Vec<f64>,
        base_m: f64,
        rel_diff: f64,
    ) -> UpdateOutcome {
        if self.history.len() == self.cfg.history_len {
            self.history.pop_front();
        }
        self.history.push_back((new_fit, new_curve));
        self.refresh_best(self.history.len());
        self.current_fit = Some(new_fit);
        self.detected = true;
        self.consecutive_rejects = 0;

        debug!(
            "{} fit accepted: base={:.2}m rel_diff={:.3} history={}",
            self.side,
            base_m,
            rel_diff,
            self.history.len()
        );
        UpdateOutcome::Accepted
    }

    fn reject(&mut self, reason: RejectReason) -> UpdateOutcome {
        // History stays untouched; only the averaging window narrows.
        self.refresh_best(self.cfg.reject_avg_window);
        self.current_fit = self.best_fit;
        self.detected = false;
        self.consecutive_rejects += 1;

        match reason {
            RejectReason::BaseDistance { base_m } => debug!(
                "{} fit rejected: base position {:.2}m out of range",
                self.side, base_m
            ),
            RejectReason::CurveShape { rel_diff } => debug!(
                "{} fit rejected: curve shape diverged, rel_diff={:.3}",
                self.side, rel_diff
            ),
        }
        if self.consecutive_rejects == 10 {
            warn!(
                "{} has 10 consecutive rejected fits, estimate may be stale",
                self.side
            );
        }
        UpdateOutcome::Rejected(reason)
    }

    /// Recompute `best_fit`/`best_curve` as the mean over the most recent
    /// `k` history entries (all of them when `k >= len`).
    fn refresh_best(&mut self, k: usize) {
        let n = self.history.len().min(k);
        if n == 0 {
            self.best_fit = None;
            self.best_curve.clear();
            return;
        }

        let mut a = 0.0;
        let mut b = 0.0;
        let mut c = 0.0;
        let curve_len = self.history.back().map_or(0, |(_, cv)| cv.len());
        let mut curve = vec![0.0f64; curve_len];

        for (fit, cv) in self.history.iter().rev().take(n) {
            a += fit.a;
            b += fit.b;
            c += fit.c;
            for (acc, &v) in curve.iter_mut().zip(cv.iter()) {
                *acc += v;
            }
        }

        let inv = 1.0 / n as f64;
        self.best_fit = Some(QuadraticFit::new(a * inv, b * inv, c * inv));
        for v in &mut curve {
            *v *= inv;
        }
        self.best_curve = curve;
    }

    /// Clear all session state. Only an explicit restart resets a track.
    pub fn reset(&mut self) {
        self.history.clear();
        self.best_fit = None;
        self.best_curve.clear();
        self.current_fit = None;
        self.detected = false;
        self.validation_base_m = 0.0;
        self.line_base_position_m = 0.0;
        self.radius_of_curvature_m = f64::INFINITY;
        self.last_cluster = PixelCluster::default();
        self.consecutive_rejects = 0;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn side(&self) -> LaneSide {
        self.side
    }

    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn best_fit(&self) -> Option<QuadraticFit> {
        self.best_fit
    }

    pub fn best_curve(&self) -> &[f64] {
        &self.best_curve
    }

    pub fn current_fit(&self) -> Option<QuadraticFit> {
        self.current_fit
    }

    pub fn validation_base_m(&self) -> f64 {
        self.validation_base_m
    }

    pub fn line_base_position_m(&self) -> f64 {
        self.line_base_position_m
    }

    pub(crate) fn set_line_base_position_m(&mut self, offset_m: f64) {
        self.line_base_position_m = offset_m;
    }

    pub fn radius_of_curvature_m(&self) -> f64 {
        self.radius_of_curvature_m
    }

    pub(crate) fn set_radius_of_curvature_m(&mut self, radius_m: f64) {
        self.radius_of_curvature_m = radius_m;
    }

    pub fn last_cluster(&self) -> &PixelCluster {
        &self.last_cluster
    }

    pub(crate) fn set_last_cluster(&mut self, cluster: PixelCluster) {
        self.last_cluster = cluster;
    }
}

/// ‖new − best‖ / ‖best‖ over the sampled curve vectors.
fn relative_curve_distance(new_curve: &[f64], best_curve: &[f64]) -> f64 {
    debug_assert_eq!(new_curve.len(), best_curve.len());
    let mut diff_sq = 0.0f64;
    let mut base_sq = 0.0f64;
    for (&n, &b) in new_curve.iter().zip(best_curve.iter()) {
        diff_sq += (n - b) * (n - b);
        base_sq += b * b;
    }
    if base_sq == 0.0 {
        // Degenerate smoothed curve at x ≡ 0; any difference counts as total.
        return if diff_sq == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (diff_sq / base_sq).sqrt()
}
