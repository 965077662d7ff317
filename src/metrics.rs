// src/metrics.rs
//
// Physical driving metrics derived from the lane fits: radius of curvature
// from the world-space quadratic, and the vehicle's lateral offset from the
// two boundaries' bottom-row positions.

use crate::types::QuadraticFit;

/// Leading coefficients below this are treated as a straight boundary.
const STRAIGHT_EPS: f64 = 1e-12;

/// Radius of curvature (meters) of a world-space fit at evaluation height
/// `y_eval_m` (meters):
///
///   R = (1 + (2a·y + b)²)^{3/2} / |2a|
///
/// A vanishing leading coefficient means a straight boundary; the radius is
/// reported as the `f64::INFINITY` sentinel instead of dividing by zero.
pub fn radius_of_curvature(world_fit: &QuadraticFit, y_eval_m: f64) -> f64 {
    let two_a = 2.0 * world_fit.a;
    if two_a.abs() < STRAIGHT_EPS {
        return f64::INFINITY;
    }
    let slope = two_a * y_eval_m + world_fit.b;
    (1.0 + slope * slope).powf(1.5) / two_a.abs()
}

/// Signed lateral offset (meters) of the vehicle from the lane center,
/// computed from both pixel-space fits at the bottom row. Negative = left of
/// center, positive = right of center.
pub fn vehicle_offset(
    left_fit: &QuadraticFit,
    right_fit: &QuadraticFit,
    y_bottom_px: f64,
    image_center_x: f64,
    xm_per_pix: f64,
) -> f64 {
    let lane_center = (left_fit.eval(y_bottom_px) + right_fit.eval(y_bottom_px)) / 2.0;
    (lane_center - image_center_x) * xm_per_pix
}
