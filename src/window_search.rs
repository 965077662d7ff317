// src/window_search.rs
//
// Sliding-window lane pixel association on a bird's-eye binary mask.
//
// The column histogram of the bottom half of the mask has two peaks where the
// (roughly vertical) lane boundaries meet the bottom of the view. Each peak
// seeds a search window that walks upward band by band, re-centering on the
// mean x of the pixels it captures, so the window follows the boundary as it
// curves.
//
// Once a tracker has an established fit, the per-band sweep is unnecessary:
// `search_around_fit` collects pixels in a ±margin corridor around the prior
// fit in a single pass.

use crate::config::SearchConfig;
use crate::types::{BinaryMask, PixelCluster, QuadraticFit};
use tracing::{debug, trace};

/// Per-side pixel clusters produced by one sweep over the mask.
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    pub left: PixelCluster,
    pub right: PixelCluster,
}

/// Column-wise on-pixel counts over the bottom half of the mask.
pub fn column_histogram(mask: &BinaryMask) -> Vec<u32> {
    let mut hist = vec![0u32; mask.width()];
    for y in mask.height() / 2..mask.height() {
        for (x, count) in hist.iter_mut().enumerate() {
            if mask.get(x, y) {
                *count += 1;
            }
        }
    }
    hist
}

/// Index of the first maximum in the slice. Empty slices return 0.
fn argmax(values: &[u32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Full sliding-window sweep: histogram seeding at the bottom, then
/// `nwindows` bands walked bottom-to-top per side.
///
/// A band with no pixels in range leaves the window center where it is and
/// contributes nothing; that is never an error here. An empty final cluster
/// only becomes a failure at fit time.
pub fn sliding_window(mask: &BinaryMask, cfg: &SearchConfig) -> SearchOutput {
    let width = mask.width();
    let height = mask.height();
    let midpoint = width / 2;

    let hist = column_histogram(mask);
    let mut left_current = argmax(&hist[..midpoint]) as i64;
    let mut right_current = (midpoint + argmax(&hist[midpoint..])) as i64;

    trace!("histogram seeds: left={left_current} right={right_current}");

    let window_height = height / cfg.nwindows;
    let mut out = SearchOutput {
        left: PixelCluster::with_capacity(1024),
        right: PixelCluster::with_capacity(1024),
    };

    for band in 0..cfg.nwindows {
        let y_high = height - band * window_height;
        let y_low = height.saturating_sub((band + 1) * window_height);

        left_current = collect_band(mask, y_low, y_high, left_current, cfg, &mut out.left);
        right_current = collect_band(mask, y_low, y_high, right_current, cfg, &mut out.right);
    }

    debug!(
        "sliding-window sweep: {} left / {} right pixels",
        out.left.len(),
        out.right.len()
    );

    out
}

/// Collect on-pixels within ±margin of `center` in one horizontal band and
/// append them to `out`. Returns the next band's window center: the mean x of
/// the captured pixels when there are more than `minpix` of them, otherwise
/// the unchanged `center`.
fn collect_band(
    mask: &BinaryMask,
    y_low: usize,
    y_high: usize,
    center: i64,
    cfg: &SearchConfig,
    out: &mut PixelCluster,
) -> i64 {
    let margin = cfg.margin as i64;
    let x_low = (center - margin).max(0);
    let x_high = (center + margin).min(mask.width() as i64 - 1);
    if x_low > x_high {
        // Window walked entirely off the mask; keep the center and let a
        // later band (or the next frame's histogram) recover it.
        return center;
    }

    let mut sum_x = 0u64;
    let mut count = 0usize;
    for y in y_low..y_high {
        for x in x_low as usize..=x_high as usize {
            if mask.get(x, y) {
                out.push(x as u32, y as u32);
                sum_x += x as u64;
                count += 1;
            }
        }
    }

    if count > cfg.minpix {
        (sum_x as f64 / count as f64).round() as i64
    } else {
        center
    }
}

/// Targeted search: collect on-pixels within ±margin of a prior fit, one pass
/// over every row. Used once a tracker has history; falls back to
/// `sliding_window` at the pipeline level when the corridor comes up empty.
pub fn search_around_fit(mask: &BinaryMask, fit: &QuadraticFit, margin: usize) -> PixelCluster {
    let width = mask.width() as i64;
    let margin = margin as i64;
    let mut cluster = PixelCluster::with_capacity(1024);

    for y in 0..mask.height() {
        let center = fit.eval(y as f64).round() as i64;
        let x_low = (center - margin).max(0);
        let x_high = (center + margin).min(width - 1);
        if x_low > x_high {
            continue;
        }
        for x in x_low as usize..=x_high as usize {
            if mask.get(x, y) {
                cluster.push(x as u32, y as u32);
            }
        }
    }

    cluster
}
