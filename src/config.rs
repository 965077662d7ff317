// src/config.rs
//
// Session configuration. Defaults match a 1280×720 bird's-eye mask with the
// usual US-highway world scaling: the warped region spans roughly 30 m
// vertically over 720 rows and a 3.7 m lane over ~700 columns.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sliding-window search tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of vertically stacked search bands.
    pub nwindows: usize,
    /// Half-width of each search window around the running center, in pixels.
    pub margin: usize,
    /// Minimum on-pixels in a band before the window center walks to their
    /// mean x.
    pub minpix: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            nwindows: 9,
            margin: 100,
            minpix: 50,
        }
    }
}

/// Cross-frame tracking tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Bounded history capacity; oldest accepted fit is evicted on overflow.
    pub history_len: usize,
    /// During a reject streak the smoothed estimate averages only this many
    /// most-recent accepted fits, so recovery is not anchored to stale data.
    pub reject_avg_window: usize,
    /// Maximum |line base position| (meters from image center) for a new fit
    /// to pass validation.
    pub max_distance_m: f64,
    /// Maximum relative Euclidean distance between the new sampled curve and
    /// the smoothed curve for a new fit to pass validation.
    pub max_rel_fitx: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            history_len: 15,
            reject_avg_window: 8,
            max_distance_m: 2.8,
            max_rel_fitx: 0.15,
        }
    }
}

/// Full per-session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Mask width in pixels.
    pub image_width: usize,
    /// Mask height in pixels.
    pub image_height: usize,
    /// x coordinate of the vehicle centerline in mask space. Half the image
    /// width for a centered camera.
    pub image_center_x: f64,
    /// Meters per pixel along y (vertical) in the bird's-eye view.
    pub ym_per_pix: f64,
    /// Meters per pixel along x (horizontal) in the bird's-eye view.
    pub xm_per_pix: f64,
    pub search: SearchConfig,
    pub track: TrackConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            image_width: 1280,
            image_height: 720,
            image_center_x: 640.0,
            ym_per_pix: 30.0 / 720.0,
            xm_per_pix: 3.7 / 700.0,
            search: SearchConfig::default(),
            track: TrackConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load a configuration from a YAML file. Missing keys fall back to the
    /// defaults above.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: TrackerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Check tunables that later stages divide or index by. A zero band
    /// count or a zero-sized frame has no meaningful interpretation and
    /// would otherwise only fail deep inside the window sweep.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.image_width >= 1 && self.image_height >= 1,
            "image dimensions must be at least 1x1, got {}x{}",
            self.image_width,
            self.image_height
        );
        ensure!(self.search.nwindows >= 1, "nwindows must be at least 1");
        ensure!(self.track.history_len >= 1, "history_len must be at least 1");
        Ok(())
    }

    /// y of the bottom mask row, where geometry is closest to the vehicle.
    #[inline]
    pub fn bottom_row(&self) -> f64 {
        (self.image_height - 1) as f64
    }
}
