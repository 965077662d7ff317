// src/polyfit.rs
//
// Least-squares quadratic fitting of lane pixel clusters.
//
// Fits x = a·y² + b·y + c by accumulating the normal equations in f64 and
// solving the 3×3 system with Gaussian elimination. Each cluster is fitted
// twice: once in pixel units and once with every point scaled to meters
// first. Scaling the points (rather than the coefficients) is required
// because the vertical and horizontal meter-per-pixel factors differ.

use crate::error::{LaneError, Result};
use crate::types::{LaneSide, PixelCluster, QuadraticFit};

/// A quadratic fit needs three points to be well-posed.
pub const MIN_FIT_POINTS: usize = 3;

/// Pixel-space and world-space (meters) fits of one cluster.
#[derive(Debug, Clone, Copy)]
pub struct LaneFit {
    pub pixel: QuadraticFit,
    pub world: QuadraticFit,
}

/// Fit one side's pixel cluster in both unit systems.
pub fn fit_cluster(
    cluster: &PixelCluster,
    side: LaneSide,
    xm_per_pix: f64,
    ym_per_pix: f64,
) -> Result<LaneFit> {
    if cluster.len() < MIN_FIT_POINTS {
        return Err(LaneError::InsufficientPixels {
            side,
            count: cluster.len(),
        });
    }

    let pixel = fit_points(cluster.points()).ok_or(LaneError::SingularFit { side })?;
    let world = fit_points(
        cluster
            .points()
            .map(|(x, y)| (x * xm_per_pix, y * ym_per_pix)),
    )
    .ok_or(LaneError::SingularFit { side })?;

    Ok(LaneFit { pixel, world })
}

/// Least-squares quadratic x(y) over an iterator of (x, y) points.
///
/// Returns None when the normal equations are singular — fewer than three
/// distinct y values, or coefficients that come out non-finite.
pub fn fit_points<I>(points: I) -> Option<QuadraticFit>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut s0 = 0.0f64;
    let mut s1 = 0.0f64;
    let mut s2 = 0.0f64;
    let mut s3 = 0.0f64;
    let mut s4 = 0.0f64;
    let mut sx0 = 0.0f64;
    let mut sx1 = 0.0f64;
    let mut sx2 = 0.0f64;

    for (x, y) in points {
        let y2 = y * y;
        s0 += 1.0;
        s1 += y;
        s2 += y2;
        s3 += y2 * y;
        s4 += y2 * y2;
        sx0 += x;
        sx1 += x * y;
        sx2 += x * y2;
    }

    if s0 < MIN_FIT_POINTS as f64 {
        return None;
    }

    // Normal equations:
    //   | s4 s3 s2 | | a |   | sx2 |
    //   | s3 s2 s1 | | b | = | sx1 |
    //   | s2 s1 s0 | | c |   | sx0 |
    let (a, b, c) = solve_3x3([s4, s3, s2, s3, s2, s1, s2, s1, s0], [sx2, sx1, sx0])?;
    Some(QuadraticFit::new(a, b, c))
}

/// Gaussian elimination for the 3×3 normal-equation system `mat · x = rhs`
/// (`mat` row-major), pivoting on the largest remaining column entry for
/// stability. None when a pivot collapses below 1e-12 — the cluster
/// geometry cannot pin down three coefficients.
fn solve_3x3(mat: [f64; 9], rhs: [f64; 3]) -> Option<(f64, f64, f64)> {
    let mut m = [
        [mat[0], mat[1], mat[2], rhs[0]],
        [mat[3], mat[4], mat[5], rhs[1]],
        [mat[6], mat[7], mat[8], rhs[2]],
    ];

    for col in 0..3 {
        let mut max_val = m[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..3 {
            if m[row][col].abs() > max_val {
                max_val = m[row][col].abs();
                max_row = row;
            }
        }

        if max_val < 1e-12 {
            return None;
        }

        if max_row != col {
            m.swap(col, max_row);
        }

        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for j in col..4 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    if m[2][2].abs() < 1e-12 {
        return None;
    }
    let c = m[2][3] / m[2][2];
    let b = (m[1][3] - m[1][2] * c) / m[1][1];
    let a = (m[0][3] - m[0][2] * c - m[0][1] * b) / m[0][0];

    if a.is_finite() && b.is_finite() && c.is_finite() {
        Some((a, b, c))
    } else {
        None
    }
}
