//! Affine transforms for label geometry.
//!
//! Image augmentation rotates and mirrors pictures; the labels drawn on
//! them must follow through the exact same matrix. This module builds those
//! matrices, chains them, and maps point sets through them. Fitting the
//! mapped points back into boxes lives in [`fit`].
//!
//! # Angle convention
//!
//! Callers speak in *clockwise-positive* degrees ("rotate the page 15° to
//! the right"). The matrix math below is the usual image-library one, where
//! positive angles turn counter-clockwise on screen. The single conversion
//! point between the two is [`to_library_angle`].

pub mod fit;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ir::{Pixel, Point};

pub use fit::{fit_axis_aligned_box, fit_oriented_box, normalize, Normalize};

/// A 2×3 affine matrix `[[a, b, tx], [c, d, ty]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub m: [[f64; 3]; 2],
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    };

    #[inline]
    pub fn new(m: [[f64; 3]; 2]) -> Self {
        Self { m }
    }

    /// Maps a single point.
    #[inline]
    pub fn apply(&self, p: &Point<Pixel>) -> Point<Pixel> {
        let [[a, b, tx], [c, d, ty]] = self.m;
        Point::new(a * p.x + b * p.y + tx, c * p.x + d * p.y + ty)
    }

    /// `self ∘ first`: the transform that applies `first`, then `self`.
    pub fn after(&self, first: &AffineTransform) -> AffineTransform {
        let a = self.to_homogeneous();
        let b = first.to_homogeneous();
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
            }
        }
        AffineTransform::new([out[0], out[1]])
    }

    fn to_homogeneous(self) -> [[f64; 3]; 3] {
        [self.m[0], self.m[1], [0.0, 0.0, 1.0]]
    }

    /// Linear part is a pure rotation by a multiple of 90° (or a mirror),
    /// so axis-aligned boxes stay axis-aligned.
    pub fn preserves_axis_alignment(&self) -> bool {
        const EPS: f64 = 1e-9;
        let [[a, b, _], [c, d, _]] = self.m;
        (b.abs() < EPS && c.abs() < EPS) || (a.abs() < EPS && d.abs() < EPS)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Converts a clockwise-positive angle to the counter-clockwise-positive
/// convention of the rotation matrix.
#[inline]
pub fn to_library_angle(clockwise_degrees: f64) -> f64 {
    -clockwise_degrees
}

/// Folds any user angle into the clockwise range `(-180, 180]`.
///
/// `270` becomes `-90`: a quarter turn to the left rather than three
/// quarters to the right.
pub fn normalize_user_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    if a <= 180.0 {
        a
    } else {
        a - 360.0
    }
}

/// Result of [`build_rotation_matrix`]: the matrix plus the output canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub matrix: AffineTransform,
    pub width: u32,
    pub height: u32,
}

/// Builds the matrix rotating a `width × height` canvas about its center by
/// `clockwise_degrees`.
///
/// With `expand` the output canvas grows to
/// `round(w·|cos θ| + h·|sin θ|) × round(h·|cos θ| + w·|sin θ|)` and the
/// matrix is shifted to keep the rotated image centered on it, so nothing is
/// cropped. Without it the canvas keeps its size and corners fall outside.
pub fn build_rotation_matrix(
    clockwise_degrees: f64,
    width: u32,
    height: u32,
    expand: bool,
) -> Rotation {
    let theta = to_library_angle(clockwise_degrees.rem_euclid(360.0)).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (f64::from(width), f64::from(height));
    let (cx, cy) = (w / 2.0, h / 2.0);

    let mut m = [
        [cos, sin, (1.0 - cos) * cx - sin * cy],
        [-sin, cos, sin * cx + (1.0 - cos) * cy],
    ];

    if !expand {
        return Rotation {
            matrix: AffineTransform::new(m),
            width,
            height,
        };
    }

    let new_w = (w * cos.abs() + h * sin.abs()).round();
    let new_h = (h * cos.abs() + w * sin.abs()).round();
    m[0][2] += (new_w - w) / 2.0;
    m[1][2] += (new_h - h) / 2.0;

    Rotation {
        matrix: AffineTransform::new(m),
        width: new_w as u32,
        height: new_h as u32,
    }
}

/// Mirror operations. `UpsideDown` is the same flip as `Both`; it only
/// differs in how outputs are named.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorMode {
    None,
    #[serde(rename = "hflip")]
    Horizontal,
    #[serde(rename = "vflip")]
    Vertical,
    #[serde(rename = "hvflip")]
    Both,
    #[serde(rename = "upsidedown")]
    UpsideDown,
}

impl MirrorMode {
    pub fn name(&self) -> &'static str {
        match self {
            MirrorMode::None => "none",
            MirrorMode::Horizontal => "hflip",
            MirrorMode::Vertical => "vflip",
            MirrorMode::Both => "hvflip",
            MirrorMode::UpsideDown => "upsidedown",
        }
    }

    fn flips_x(&self) -> bool {
        matches!(
            self,
            MirrorMode::Horizontal | MirrorMode::Both | MirrorMode::UpsideDown
        )
    }

    fn flips_y(&self) -> bool {
        matches!(
            self,
            MirrorMode::Vertical | MirrorMode::Both | MirrorMode::UpsideDown
        )
    }
}

impl fmt::Display for MirrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MirrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(MirrorMode::None),
            "hflip" | "horizontal" => Ok(MirrorMode::Horizontal),
            "vflip" | "vertical" => Ok(MirrorMode::Vertical),
            "hvflip" | "both" => Ok(MirrorMode::Both),
            "upsidedown" => Ok(MirrorMode::UpsideDown),
            other => Err(format!(
                "unknown mirror mode '{other}' (expected none, hflip, vflip, hvflip, upsidedown)"
            )),
        }
    }
}

/// Builds the pixel-index mirror matrix: `x' = (width - 1) - x` and/or
/// `y' = (height - 1) - y`. The canvas size is unchanged.
pub fn build_mirror_matrix(mode: MirrorMode, width: u32, height: u32) -> AffineTransform {
    let (sx, tx) = if mode.flips_x() {
        (-1.0, f64::from(width) - 1.0)
    } else {
        (1.0, 0.0)
    };
    let (sy, ty) = if mode.flips_y() {
        (-1.0, f64::from(height) - 1.0)
    } else {
        (1.0, 0.0)
    };
    AffineTransform::new([[sx, 0.0, tx], [0.0, sy, ty]])
}

/// Chains two transforms: `b` is applied first, then `a`.
#[inline]
pub fn compose(a: &AffineTransform, b: &AffineTransform) -> AffineTransform {
    a.after(b)
}

/// Maps every point through `matrix`.
pub fn transform_points(points: &[Point<Pixel>], matrix: &AffineTransform) -> Vec<Point<Pixel>> {
    points.iter().map(|p| matrix.apply(p)).collect()
}
