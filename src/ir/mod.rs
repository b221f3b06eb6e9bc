//! Typed label geometry and the box model shared by every tool.
//!
//! All geometry is generic over a coordinate-space marker ([`Pixel`] or
//! [`Normalized`]) so that fractions read from label files cannot be fed
//! to pixel-space math without an explicit `to_pixel` call.
//!
//! # Example
//!
//! ```
//! use mangalabel::ir::{DetectionBox, Pixel, Rect};
//!
//! let rect = Rect::<Pixel>::from_ltwh(0.0, 0.0, 50.0, 20.0);
//! let det = DetectionBox::new("balloon", rect).with_text("...");
//! assert_eq!(det.rect().height(), 20.0);
//! ```

pub mod io_anylabeling;
pub mod io_yolo;
mod model;
mod obb;
mod point;
mod rect;
mod space;

pub use model::{BoxShape, DetectionBox};
pub use obb::OrientedBox;
pub use point::Point;
pub use rect::Rect;
pub use space::{Normalized, Pixel, Space};
