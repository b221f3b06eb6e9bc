#![allow(dead_code)]

use mangalabel::ir::{DetectionBox, OrientedBox, Pixel, Point, Rect};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for points mapped forward and back through a matrix.
pub const EPS_ROUNDTRIP: f64 = 1e-3;

/// Slack for corners landing on an expanded canvas whose size was rounded.
pub const EPS_CANVAS: f64 = 0.5;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_canvas() -> BoxedStrategy<(u32, u32)> {
    (8u32..=2048, 8u32..=2048).boxed()
}

pub fn arb_angle() -> BoxedStrategy<f64> {
    (-720i32..=720)
        .prop_map(|tenths| f64::from(tenths) * 0.5)
        .boxed()
}

pub fn arb_point_within(width: u32, height: u32) -> BoxedStrategy<Point<Pixel>> {
    (0.0..f64::from(width), 0.0..f64::from(height))
        .prop_map(|(x, y)| Point::new(x, y))
        .boxed()
}

/// A rectangle rotated by `angle` degrees about `(cx, cy)`, with sides of
/// at least two pixels.
pub fn arb_oriented_box() -> BoxedStrategy<OrientedBox<Pixel>> {
    (
        50.0..500.0f64,
        50.0..500.0f64,
        2.0..200.0f64,
        2.0..200.0f64,
        0.0..180.0f64,
    )
        .prop_map(|(cx, cy, w, h, angle)| oriented_box(cx, cy, w, h, angle))
        .boxed()
}

pub fn oriented_box(cx: f64, cy: f64, width: f64, height: f64, angle: f64) -> OrientedBox<Pixel> {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (hw, hh) = (width / 2.0, height / 2.0);
    let corner = |dx: f64, dy: f64| Point::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos);
    OrientedBox::new([
        corner(-hw, -hh),
        corner(hw, -hh),
        corner(hw, hh),
        corner(-hw, hh),
    ])
}

/// A page of small labeled boxes scattered over a 400×400 canvas.
pub fn arb_boxes(max_boxes: usize) -> BoxedStrategy<Vec<DetectionBox>> {
    proptest::collection::vec(
        (0u32..380, 0u32..380, 4u32..60, 4u32..60, 0usize..2),
        0..=max_boxes,
    )
    .prop_map(|seeds| {
        seeds
            .into_iter()
            .map(|(x, y, w, h, label)| {
                let rect = Rect::<Pixel>::from_ltwh(
                    f64::from(x),
                    f64::from(y),
                    f64::from(w),
                    f64::from(h),
                );
                DetectionBox::new(["balloon", "caption"][label], rect)
            })
            .collect()
    })
    .boxed()
}

pub fn approx_point(a: &Point<Pixel>, b: &Point<Pixel>, eps: f64) -> bool {
    (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps
}
