//! Coordinate space marker types.
//!
//! Label geometry lives in two spaces: absolute pixels on a concrete canvas,
//! and fractions of the canvas as written by YOLO-style label files. The
//! markers below are uninhabited types used as type parameters so the two
//! cannot be mixed without an explicit conversion.

use std::fmt;

/// Implemented by the coordinate space markers.
pub trait Space: Copy + 'static {
    /// Short name used in debug output.
    const NAME: &'static str;
}

/// Marker for absolute pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates expressed as fractions of the canvas size.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl Space for Pixel {
    const NAME: &'static str = "px";
}

impl Space for Normalized {
    const NAME: &'static str = "norm";
}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
