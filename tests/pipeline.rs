// End-to-end session tests on synthetic bird's-eye masks.

use lane_tracker::{
    BinaryMask, LaneError, LanePipeline, LaneSide, LaneStatus, QuadraticFit, TrackerConfig,
};

const WIDTH: usize = 1280;
const HEIGHT: usize = 720;
const XM_PER_PIX: f64 = 3.7 / 700.0;

/// Route tracker logs through the test harness. Repeat installs from other
/// tests in the binary are ignored.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lane_tracker=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn pipeline() -> LanePipeline {
    init_tracing();
    LanePipeline::new(TrackerConfig::default())
}

/// Paint a lane boundary following `fit` with the given half-width.
fn paint_boundary(mask: &mut BinaryMask, fit: &QuadraticFit, half_width: usize) {
    for y in 0..mask.height() {
        let cx = fit.eval(y as f64).round() as i64;
        for dx in -(half_width as i64)..=(half_width as i64) {
            let x = cx + dx;
            if x >= 0 {
                mask.set(x as usize, y);
            }
        }
    }
}

/// A clean two-boundary mask with vertical lanes at the given columns.
fn straight_lane_mask(c_left: f64, c_right: f64) -> BinaryMask {
    let mut mask = BinaryMask::zeros(WIDTH, HEIGHT);
    paint_boundary(&mut mask, &QuadraticFit::new(0.0, 0.0, c_left), 8);
    paint_boundary(&mut mask, &QuadraticFit::new(0.0, 0.0, c_right), 8);
    mask
}

#[test]
fn straight_lane_session_reports_expected_geometry() {
    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);

    let first = pipeline.process_frame(&mask, ()).unwrap();
    assert_eq!(first.left.status, LaneStatus::Seeded);
    assert_eq!(first.right.status, LaneStatus::Seeded);
    assert!(first.left.detected && first.right.detected);

    // Feed the same scene for a while; fits should keep being accepted and
    // the smoothed estimate should sit on the painted boundaries.
    let mut last = first;
    for _ in 0..20 {
        last = pipeline.process_frame(&mask, ()).unwrap();
        assert_eq!(last.left.status, LaneStatus::Accepted);
        assert_eq!(last.right.status, LaneStatus::Accepted);
    }

    let left_bottom = last.left.smoothed_fit.eval(719.0);
    let right_bottom = last.right.smoothed_fit.eval(719.0);
    assert!((left_bottom - 300.0).abs() < 3.0, "left at {left_bottom}");
    assert!((right_bottom - 980.0).abs() < 3.0, "right at {right_bottom}");

    // Straight boundaries → huge (or sentinel-infinite) radius. The painted
    // pixels are integer-rounded, so the fitted leading coefficient is only
    // numerically near zero.
    assert!(last.left.radius_m > 10_000.0);
    assert!(last.right.radius_m > 10_000.0);

    // Lane center 640 == image center → offset ≈ 0
    assert!(last.offset_m.abs() < 0.05, "offset {}", last.offset_m);
    assert_eq!(last.left.line_base_position_m, last.offset_m);
    assert_eq!(last.right.line_base_position_m, last.offset_m);

    // History is bounded for both sides
    assert!(pipeline.track(LaneSide::Left).history_len() <= 15);
    assert!(pipeline.track(LaneSide::Right).history_len() <= 15);
}

#[test]
fn offset_reflects_off_center_vehicle() {
    let mut pipeline = pipeline();
    // Lane center at (340 + 1040) / 2 = 690, 50 px right of image center
    let mask = straight_lane_mask(340.0, 1040.0);

    let mut report = pipeline.process_frame(&mask, ()).unwrap();
    for _ in 0..5 {
        report = pipeline.process_frame(&mask, ()).unwrap();
    }

    let expected = 50.0 * XM_PER_PIX;
    assert!(
        (report.offset_m - expected).abs() < 0.02,
        "offset {} expected {expected}",
        report.offset_m
    );
    assert!(report.offset_m > 0.0, "vehicle should be right of center");
}

#[test]
fn polygon_spans_between_boundaries() {
    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);
    let report = pipeline.process_frame(&mask, ()).unwrap();

    assert_eq!(report.polygon.len(), 2 * HEIGHT);
    // First half descends the left boundary, second half climbs the right
    let (x0, y0) = report.polygon[0];
    let (xn, yn) = report.polygon[HEIGHT];
    assert_eq!(y0, 0.0);
    assert_eq!(yn, (HEIGHT - 1) as f64);
    assert!(x0 < 400.0);
    assert!(xn > 900.0);
}

#[test]
fn empty_first_frame_reports_no_estimate() {
    let mut pipeline = pipeline();
    let mask = BinaryMask::zeros(WIDTH, HEIGHT);

    let err = pipeline.process_frame(&mask, ()).unwrap_err();
    assert!(
        matches!(err, LaneError::NoEstimate { .. }),
        "expected NoEstimate, got {err:?}"
    );
}

#[test]
fn dropout_frame_falls_back_to_history() {
    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);
    for _ in 0..5 {
        pipeline.process_frame(&mask, ()).unwrap();
    }

    // A frame where thresholding found nothing: both fits fail, but the
    // session keeps reporting the history-smoothed geometry.
    let empty = BinaryMask::zeros(WIDTH, HEIGHT);
    let report = pipeline.process_frame(&empty, ()).unwrap();
    assert_eq!(report.left.status, LaneStatus::FitFailed);
    assert_eq!(report.right.status, LaneStatus::FitFailed);
    assert!(!report.left.detected);
    assert!(report.left.raw_fit.is_none());
    let left_bottom = report.left.smoothed_fit.eval(719.0);
    assert!((left_bottom - 300.0).abs() < 3.0);

    // Recovery on the next good frame
    let recovered = pipeline.process_frame(&mask, ()).unwrap();
    assert_eq!(recovered.left.status, LaneStatus::Accepted);
    assert!(recovered.left.detected);
}

#[test]
fn lateral_jump_is_rejected_and_history_preserved() {
    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);
    for _ in 0..10 {
        pipeline.process_frame(&mask, ()).unwrap();
    }
    let history_before = pipeline.track(LaneSide::Left).history_len();

    // The left boundary teleports 200 px. That is outside the targeted
    // corridor, so the sweep finds the jumped line — whose fit then fails
    // the 15% curve-shape gate.
    let jumped = straight_lane_mask(500.0, 980.0);
    let report = pipeline.process_frame(&jumped, ()).unwrap();
    assert_eq!(report.left.status, LaneStatus::Rejected);
    assert!(!report.left.detected);
    assert_eq!(
        pipeline.track(LaneSide::Left).history_len(),
        history_before,
        "rejection must not change history length"
    );
    // The smoothed estimate still reflects the pre-jump scene
    let left_bottom = report.left.smoothed_fit.eval(719.0);
    assert!((left_bottom - 300.0).abs() < 5.0, "left at {left_bottom}");
}

#[test]
fn curved_lane_has_finite_radius() {
    let mut pipeline = pipeline();
    let mut mask = BinaryMask::zeros(WIDTH, HEIGHT);
    // Gentle rightward curve: ~72 px of bow over the mask height
    let left = QuadraticFit::new(1.4e-4, 0.0, 280.0);
    let right = QuadraticFit::new(1.4e-4, 0.0, 960.0);
    paint_boundary(&mut mask, &left, 8);
    paint_boundary(&mut mask, &right, 8);

    let mut report = pipeline.process_frame(&mask, ()).unwrap();
    for _ in 0..3 {
        report = pipeline.process_frame(&mask, ()).unwrap();
    }

    assert!(report.left.radius_m.is_finite());
    assert!(report.right.radius_m.is_finite());
    // Plausible highway-scale radius, not a degenerate number
    assert!(report.left.radius_m > 50.0 && report.left.radius_m < 50_000.0);
}

#[test]
fn reset_restarts_the_session() {
    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);
    for _ in 0..5 {
        pipeline.process_frame(&mask, ()).unwrap();
    }
    assert!(pipeline.track(LaneSide::Left).history_len() > 1);

    pipeline.reset();
    assert_eq!(pipeline.track(LaneSide::Left).history_len(), 0);

    // A completely different scene seeds cleanly after reset, where the gate
    // would have rejected it mid-session.
    let other = straight_lane_mask(420.0, 860.0);
    let report = pipeline.process_frame(&other, ()).unwrap();
    assert_eq!(report.frame_index, 0);
    assert_eq!(report.left.status, LaneStatus::Seeded);
}

#[test]
fn unwarp_handle_is_passed_through() {
    #[derive(Debug, Clone, PartialEq)]
    struct InverseTransform(u32);

    let mut pipeline = pipeline();
    let mask = straight_lane_mask(300.0, 980.0);
    let report = pipeline.process_frame(&mask, InverseTransform(7)).unwrap();
    assert_eq!(report.unwarp, InverseTransform(7));
}

#[test]
fn wrong_mask_shape_is_rejected() {
    let mut pipeline = pipeline();
    let mask = BinaryMask::zeros(640, 480);
    let err = pipeline.process_frame(&mask, ()).unwrap_err();
    assert!(matches!(err, LaneError::MaskShape { .. }));
}
