//! Refitting transformed point sets into boxes.

use std::cmp::Ordering;

use crate::ir::{Normalized, OrientedBox, Pixel, Point, Rect};

/// Axis-aligned bounds of `points`.
///
/// An empty slice yields an empty rectangle at the origin.
pub fn fit_axis_aligned_box(points: &[Point<Pixel>]) -> Rect<Pixel> {
    if points.is_empty() {
        return Rect::default();
    }

    let mut xmin = f64::INFINITY;
    let mut ymin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for p in points {
        xmin = xmin.min(p.x);
        ymin = ymin.min(p.y);
        xmax = xmax.max(p.x);
        ymax = ymax.max(p.y);
    }
    Rect::from_xyxy(xmin, ymin, xmax, ymax)
}

/// Minimum-area rectangle enclosing `points`, at any orientation.
///
/// Rotating an oriented label and then re-bounding it axis-aligned would
/// inflate it on every augmentation pass; fitting the minimum-area
/// rectangle keeps a rotated rectangle tight.
///
/// Degenerate input never fails:
/// - fewer than three distinct points give a zero-area box spanning them;
/// - collinear points give their axis-aligned bounds.
pub fn fit_oriented_box(points: &[Point<Pixel>]) -> OrientedBox<Pixel> {
    let distinct = distinct_points(points);
    match distinct.len() {
        0 => return OrientedBox::new([Point::default(); 4]),
        1 => return OrientedBox::new([distinct[0]; 4]),
        2 => return OrientedBox::new([distinct[0], distinct[1], distinct[1], distinct[0]]),
        _ => {}
    }

    let hull = convex_hull(&distinct);
    if hull.len() < 3 {
        return OrientedBox::from(fit_axis_aligned_box(points));
    }

    min_area_rect(&hull)
}

fn distinct_points(points: &[Point<Pixel>]) -> Vec<Point<Pixel>> {
    const EPS: f64 = 1e-9;
    let mut out: Vec<Point<Pixel>> = Vec::with_capacity(points.len());
    for p in points {
        if !out
            .iter()
            .any(|q| (q.x - p.x).abs() < EPS && (q.y - p.y).abs() < EPS)
        {
            out.push(*p);
        }
    }
    out
}

/// Andrew's monotone chain. Collinear points are dropped from the hull.
fn convex_hull(points: &[Point<Pixel>]) -> Vec<Point<Pixel>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });

    let mut lower: Vec<Point<Pixel>> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point<Pixel>> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[inline]
fn cross(o: &Point<Pixel>, a: &Point<Pixel>, b: &Point<Pixel>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Rotating calipers over the hull edges: one edge of the optimal
/// rectangle is always collinear with a hull edge.
fn min_area_rect(hull: &[Point<Pixel>]) -> OrientedBox<Pixel> {
    let n = hull.len();
    let mut best: Option<(f64, OrientedBox<Pixel>)> = None;

    for i in 0..n {
        let p1 = hull[i];
        let p2 = hull[(i + 1) % n];
        let len = p1.distance_to(&p2);
        if len < 1e-12 {
            continue;
        }

        let (ux, uy) = ((p2.x - p1.x) / len, (p2.y - p1.y) / len);
        let (vx, vy) = (-uy, ux);

        let mut min_u = f64::INFINITY;
        let mut max_u = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;
        for p in hull {
            let (dx, dy) = (p.x - p1.x, p.y - p1.y);
            let u = dx * ux + dy * uy;
            let v = dx * vx + dy * vy;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if best.as_ref().is_some_and(|(best_area, _)| *best_area <= area) {
            continue;
        }

        let to_xy = |u: f64, v: f64| Point::new(p1.x + u * ux + v * vx, p1.y + u * uy + v * vy);
        let corners = [
            to_xy(min_u, min_v),
            to_xy(max_u, min_v),
            to_xy(max_u, max_v),
            to_xy(min_u, max_v),
        ];
        best = Some((area, OrientedBox::new(corners)));
    }

    match best {
        Some((_, obb)) => obb,
        None => OrientedBox::from(fit_axis_aligned_box(hull)),
    }
}

/// Geometry that can be expressed as fractions of a canvas.
pub trait Normalize {
    type Output;

    /// Divides x by `canvas_width`, y by `canvas_height`, and clamps into
    /// `[0, 1]`. Clamping absorbs the small overshoot produced at canvas
    /// edges by the minimum-area fit.
    fn normalize(&self, canvas_width: f64, canvas_height: f64) -> Self::Output;
}

impl Normalize for Point<Pixel> {
    type Output = Point<Normalized>;

    fn normalize(&self, canvas_width: f64, canvas_height: f64) -> Self::Output {
        self.to_normalized(canvas_width, canvas_height)
    }
}

impl Normalize for Rect<Pixel> {
    type Output = Rect<Normalized>;

    fn normalize(&self, canvas_width: f64, canvas_height: f64) -> Self::Output {
        self.to_normalized(canvas_width, canvas_height)
    }
}

impl Normalize for OrientedBox<Pixel> {
    type Output = OrientedBox<Normalized>;

    fn normalize(&self, canvas_width: f64, canvas_height: f64) -> Self::Output {
        self.to_normalized(canvas_width, canvas_height)
    }
}

impl Normalize for [Point<Pixel>] {
    type Output = Vec<Point<Normalized>>;

    fn normalize(&self, canvas_width: f64, canvas_height: f64) -> Self::Output {
        self.iter()
            .map(|p| p.to_normalized(canvas_width, canvas_height))
            .collect()
    }
}

/// Free-function form of [`Normalize::normalize`].
#[inline]
pub fn normalize<T: Normalize + ?Sized>(
    value: &T,
    canvas_width: f64,
    canvas_height: f64,
) -> T::Output {
    value.normalize(canvas_width, canvas_height)
}
