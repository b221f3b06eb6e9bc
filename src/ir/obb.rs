//! Oriented (rotated) bounding boxes.

use serde::{Deserialize, Serialize};

use super::point::Point;
use super::rect::Rect;
use super::space::{Normalized, Pixel, Space};

/// A rotated rectangle given by its four corners in winding order.
///
/// The first edge (`corners[0] -> corners[1]`) defines the box width and
/// its rotation; the second edge (`corners[0] -> corners[3]`) defines the
/// height. This matches the `p1..p4` layout used by YOLO-OBB rows and
/// X-AnyLabeling `rotation` shapes.
#[derive(Clone, Copy, PartialEq)]
pub struct OrientedBox<TSpace> {
    pub corners: [Point<TSpace>; 4],
}

impl<TSpace> OrientedBox<TSpace> {
    #[inline]
    pub fn new(corners: [Point<TSpace>; 4]) -> Self {
        Self { corners }
    }

    /// Center as the midpoint of the first diagonal.
    #[inline]
    pub fn center(&self) -> Point<TSpace> {
        self.corners[0].midpoint(&self.corners[2])
    }

    /// Length of the first edge.
    #[inline]
    pub fn width(&self) -> f64 {
        self.corners[0].distance_to(&self.corners[1])
    }

    /// Length of the edge adjacent to the first one.
    #[inline]
    pub fn height(&self) -> f64 {
        self.corners[0].distance_to(&self.corners[3])
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Direction of the first edge in degrees, in `[0, 360)`.
    pub fn angle_degrees(&self) -> f64 {
        let dx = self.corners[1].x - self.corners[0].x;
        let dy = self.corners[1].y - self.corners[0].y;
        dy.atan2(dx).to_degrees().rem_euclid(360.0)
    }

    /// The box with its rotation undone about the center.
    ///
    /// Schemas that store `(x, y, width, height, angle)` want this
    /// rectangle together with [`OrientedBox::angle_degrees`].
    pub fn unrotated_rect(&self) -> Rect<TSpace> {
        let c = self.center();
        Rect::from_cxcywh(c.x, c.y, self.width(), self.height())
    }

    /// Axis-aligned bounds of the four corners.
    pub fn bounding_rect(&self) -> Rect<TSpace> {
        let mut xmin = f64::INFINITY;
        let mut ymin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;
        let mut ymax = f64::NEG_INFINITY;
        for p in &self.corners {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        Rect::from_xyxy(xmin, ymin, xmax, ymax)
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(Point::is_finite)
    }
}

impl<TSpace> From<Rect<TSpace>> for OrientedBox<TSpace> {
    fn from(rect: Rect<TSpace>) -> Self {
        Self::new(rect.corners())
    }
}

impl OrientedBox<Pixel> {
    /// Converts every corner to canvas fractions, clamped into `[0, 1]`.
    pub fn to_normalized(&self, canvas_width: f64, canvas_height: f64) -> OrientedBox<Normalized> {
        OrientedBox::new(
            self.corners
                .map(|p| p.to_normalized(canvas_width, canvas_height)),
        )
    }
}

impl OrientedBox<Normalized> {
    pub fn to_pixel(&self, canvas_width: f64, canvas_height: f64) -> OrientedBox<Pixel> {
        OrientedBox::new(self.corners.map(|p| p.to_pixel(canvas_width, canvas_height)))
    }
}

impl<TSpace: Space> std::fmt::Debug for OrientedBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientedBox")
            .field("corners", &self.corners)
            .finish()
    }
}

impl<TSpace> Serialize for OrientedBox<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.corners.serialize(serializer)
    }
}

impl<'de, TSpace> Deserialize<'de> for OrientedBox<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let corners = <[Point<TSpace>; 4]>::deserialize(deserializer)?;
        Ok(OrientedBox::new(corners))
    }
}
