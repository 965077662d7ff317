// src/types.rs
//
// Core data types shared across the tracking pipeline.
//
// Coordinate system:
//   All geometry lives in top-down (bird's-eye) mask space. x grows rightward,
//   y grows downward, so the bottom row (largest y) is nearest the vehicle.
//   Lane boundaries are modeled as x = a·y² + b·y + c with x a function of y,
//   since the boundaries are roughly vertical in the rectified view.

use crate::error::{LaneError, Result};
use std::fmt;

/// Which lane boundary a cluster / fit / track belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSide {
    Left,
    Right,
}

impl LaneSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for LaneSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-down binary mask: row-major u8 buffer, one byte per pixel, where any
/// non-zero value counts as an on-pixel. Produced externally per frame by the
/// thresholding + perspective-warp collaborators.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BinaryMask {
    /// Wrap an existing row-major buffer. The buffer length must be exactly
    /// `width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height {
            return Err(LaneError::MaskShape {
                width,
                height,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-zero mask, mostly useful for tests and synthetic inputs.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the pixel at (x, y) is on. Caller guarantees bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }

    /// Turn a pixel on (no-op if out of bounds). Synthetic-input helper.
    pub fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = 1;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Unordered set of on-pixel coordinates belonging to one lane side in one
/// frame. Stored as parallel arrays so the fitter can stream (x, y) pairs
/// without per-point allocation.
#[derive(Debug, Clone, Default)]
pub struct PixelCluster {
    xs: Vec<u32>,
    ys: Vec<u32>,
}

impl PixelCluster {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            xs: Vec::with_capacity(cap),
            ys: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn push(&mut self, x: u32, y: u32) {
        self.xs.push(x);
        self.ys.push(y);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Iterate coordinates as f64 pairs, ready for least-squares accumulation.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| (x as f64, y as f64))
    }

    /// Mean x coordinate of the cluster, if non-empty.
    pub fn mean_x(&self) -> Option<f64> {
        if self.xs.is_empty() {
            return None;
        }
        Some(self.xs.iter().map(|&x| x as f64).sum::<f64>() / self.xs.len() as f64)
    }
}

/// Quadratic lane boundary model x = a·y² + b·y + c.
///
/// Exists in two unit systems: pixel space (mask coordinates) and world
/// space (meters), produced by separate fits since the meter-per-pixel
/// scaling is anisotropic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl QuadraticFit {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Evaluate x at the given y.
    #[inline]
    pub fn eval(&self, y: f64) -> f64 {
        (self.a * y + self.b) * y + self.c
    }

    /// Sample the fit at every integer row in [0, height).
    ///
    /// The sampled curve is what the tracker smooths and compares across
    /// frames, and what the output polygon is built from.
    pub fn sample(&self, height: usize) -> Vec<f64> {
        (0..height).map(|y| self.eval(y as f64)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_shape_is_validated() {
        let err = BinaryMask::new(10, 10, vec![0u8; 99]).unwrap_err();
        assert_eq!(
            err,
            LaneError::MaskShape {
                width: 10,
                height: 10,
                got: 99
            }
        );
    }

    #[test]
    fn mask_set_get_roundtrip() {
        let mut mask = BinaryMask::zeros(8, 4);
        mask.set(3, 2);
        assert!(mask.get(3, 2));
        assert!(!mask.get(2, 3));
        // Out-of-bounds set is ignored
        mask.set(100, 100);
    }

    #[test]
    fn quadratic_eval_and_sample() {
        let fit = QuadraticFit::new(2.0, -1.0, 5.0);
        assert_eq!(fit.eval(0.0), 5.0);
        assert_eq!(fit.eval(3.0), 2.0 * 9.0 - 3.0 + 5.0);
        let curve = fit.sample(4);
        assert_eq!(curve.len(), 4);
        assert_eq!(curve[0], 5.0);
        assert_eq!(curve[3], fit.eval(3.0));
    }

    #[test]
    fn cluster_mean_x() {
        let mut cluster = PixelCluster::default();
        assert!(cluster.mean_x().is_none());
        cluster.push(10, 0);
        cluster.push(20, 1);
        assert_eq!(cluster.mean_x(), Some(15.0));
    }
}
