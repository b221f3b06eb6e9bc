//! Axis-aligned rectangles in XYXY form.

use serde::{Deserialize, Serialize};

use super::point::{clamp_unit, Point};
use super::space::{Normalized, Pixel, Space};

/// An axis-aligned rectangle stored as `(xmin, ymin, xmax, ymax)`.
///
/// Construction does not reorder or validate the corners. Detector output
/// and hand-edited label files can contain inverted or empty boxes, and
/// those are filtered by the callers that care (see [`Rect::is_ordered`]
/// and [`Rect::area`]).
#[derive(Clone, Copy, PartialEq)]
pub struct Rect<TSpace> {
    pub min: Point<TSpace>,
    pub max: Point<TSpace>,
}

impl<TSpace> Rect<TSpace> {
    #[inline]
    pub fn new(min: Point<TSpace>, max: Point<TSpace>) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        }
    }

    /// Builds a rectangle from its top-left corner and extent.
    #[inline]
    pub fn from_ltwh(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(left, top, left + width, top + height)
    }

    /// Builds a rectangle from its center and extent (the YOLO layout).
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// May be negative for an inverted rectangle.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// May be negative for an inverted rectangle.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn center(&self) -> Point<TSpace> {
        self.min.midpoint(&self.max)
    }

    /// Returns `(left, top, width, height)`.
    #[inline]
    pub fn to_ltwh(&self) -> (f64, f64, f64, f64) {
        (self.xmin(), self.ymin(), self.width(), self.height())
    }

    /// Returns `(cx, cy, width, height)`.
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let c = self.center();
        (c.x, c.y, self.width(), self.height())
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// True if min <= max on both axes.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Corners in clockwise order (screen coordinates) from the top-left.
    pub fn corners(&self) -> [Point<TSpace>; 4] {
        [
            Point::new(self.min.x, self.min.y),
            Point::new(self.max.x, self.min.y),
            Point::new(self.max.x, self.max.y),
            Point::new(self.min.x, self.max.y),
        ]
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_xyxy(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    /// Length of the shared x-interval, zero when disjoint.
    #[inline]
    pub fn overlap_x(&self, other: &Self) -> f64 {
        (self.max.x.min(other.max.x) - self.min.x.max(other.min.x)).max(0.0)
    }

    /// Length of the shared y-interval, zero when disjoint.
    #[inline]
    pub fn overlap_y(&self, other: &Self) -> f64 {
        (self.max.y.min(other.max.y) - self.min.y.max(other.min.y)).max(0.0)
    }

    /// Distance between the facing vertical edges; negative when the
    /// x-intervals overlap.
    #[inline]
    pub fn gap_x(&self, other: &Self) -> f64 {
        self.min.x.max(other.min.x) - self.max.x.min(other.max.x)
    }

    /// Distance between the facing horizontal edges; negative when the
    /// y-intervals overlap.
    #[inline]
    pub fn gap_y(&self, other: &Self) -> f64 {
        self.min.y.max(other.min.y) - self.max.y.min(other.max.y)
    }

    /// True if `other` lies inside `self`, edges included.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// True if the rectangles overlap or touch.
    #[inline]
    pub fn touches(&self, other: &Self) -> bool {
        self.max.x >= other.min.x
            && other.max.x >= self.min.x
            && self.max.y >= other.min.y
            && other.max.y >= self.min.y
    }

    /// Widens a positive but too-thin extent to `min_extent`, keeping the
    /// center fixed. Empty or inverted axes are left alone.
    pub fn with_min_extent(&self, min_extent: f64) -> Self {
        let (cx, cy, w, h) = self.to_cxcywh();
        let w = if w > 0.0 && w < min_extent { min_extent } else { w };
        let h = if h > 0.0 && h < min_extent { min_extent } else { h };
        Self::from_cxcywh(cx, cy, w, h)
    }
}

impl<TSpace: Space> std::fmt::Debug for Rect<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rect")
            .field("space", &TSpace::NAME)
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl<TSpace> Default for Rect<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

// Hand-written so that TSpace needs no serde bounds.
impl<TSpace> Serialize for Rect<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("xmin", &self.min.x)?;
        state.serialize_field("ymin", &self.min.y)?;
        state.serialize_field("xmax", &self.max.x)?;
        state.serialize_field("ymax", &self.max.y)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for Rect<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RectData {
            xmin: f64,
            ymin: f64,
            xmax: f64,
            ymax: f64,
        }
        let data = RectData::deserialize(deserializer)?;
        Ok(Rect::from_xyxy(data.xmin, data.ymin, data.xmax, data.ymax))
    }
}

impl Rect<Pixel> {
    /// Converts to fractions of the canvas, clamped into `[0, 1]`.
    pub fn to_normalized(&self, canvas_width: f64, canvas_height: f64) -> Rect<Normalized> {
        Rect::from_xyxy(
            clamp_unit(self.min.x / canvas_width),
            clamp_unit(self.min.y / canvas_height),
            clamp_unit(self.max.x / canvas_width),
            clamp_unit(self.max.y / canvas_height),
        )
    }
}

impl Rect<Normalized> {
    pub fn to_pixel(&self, canvas_width: f64, canvas_height: f64) -> Rect<Pixel> {
        Rect::new(
            self.min.to_pixel(canvas_width, canvas_height),
            self.max.to_pixel(canvas_width, canvas_height),
        )
    }
}
