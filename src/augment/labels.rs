//! Applying a variant's matrix to label rows and shapes.

use serde_json::Value;

use super::VariantGeometry;
use crate::ir::io_anylabeling::{AnyLabelingFile, SHAPE_RECTANGLE, SHAPE_ROTATION};
use crate::ir::io_yolo::{YoloRow, YoloShape};
use crate::ir::{OrientedBox, Pixel, Point};
use crate::transform::{fit_axis_aligned_box, fit_oriented_box, normalize, transform_points};

/// Areas at or below this many square pixels count as degenerate.
const MIN_AREA: f64 = 1e-9;

/// Transformed labels plus per-label counts.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelOutcome<T> {
    pub labels: T,
    pub transformed: usize,
    /// Labels dropped because the fitted box had no area.
    pub zero_area: usize,
}

/// Maps YOLO rows from a `width × height` image onto the variant canvas.
///
/// Axis-aligned rows are refit with an enclosing axis-aligned box; oriented
/// rows with a minimum-area rectangle, so they stay tight under rotation.
pub fn transform_yolo_rows(
    rows: &[YoloRow],
    geometry: &VariantGeometry,
    width: u32,
    height: u32,
) -> LabelOutcome<Vec<YoloRow>> {
    let (w, h) = (f64::from(width), f64::from(height));
    let (out_w, out_h) = (f64::from(geometry.width), f64::from(geometry.height));
    let mut outcome = LabelOutcome {
        labels: Vec::with_capacity(rows.len()),
        transformed: 0,
        zero_area: 0,
    };

    for row in rows {
        let shape = match row.shape {
            YoloShape::Hbb(rect) => {
                let corners = rect.to_pixel(w, h).corners();
                let fitted = fit_axis_aligned_box(&transform_points(&corners, &geometry.matrix))
                    .with_min_extent(1.0);
                if fitted.area() <= MIN_AREA {
                    None
                } else {
                    Some(YoloShape::Hbb(normalize(&fitted, out_w, out_h)))
                }
            }
            YoloShape::Obb(obb) => {
                let corners = obb.to_pixel(w, h).corners;
                let fitted = fit_oriented_box(&transform_points(&corners, &geometry.matrix));
                if fitted.area() <= MIN_AREA {
                    None
                } else {
                    Some(YoloShape::Obb(normalize(&fitted, out_w, out_h)))
                }
            }
        };

        match shape {
            Some(shape) => {
                outcome.labels.push(YoloRow {
                    class_id: row.class_id,
                    shape,
                });
                outcome.transformed += 1;
            }
            None => {
                tracing::debug!(class_id = row.class_id, "dropping zero-area label");
                outcome.zero_area += 1;
            }
        }
    }

    outcome
}

fn oriented_from(points: &[Point<Pixel>]) -> Option<OrientedBox<Pixel>> {
    let fitted = fit_oriented_box(points);
    (fitted.area() > MIN_AREA).then_some(fitted)
}

/// Maps every shape of an X-AnyLabeling file onto the variant canvas and
/// points the file at `image_path`.
///
/// Rectangles stay rectangles while the matrix keeps axes aligned and are
/// promoted to `rotation` shapes otherwise. Rotation shapes are refit as
/// minimum-area rectangles. Other shapes have their points mapped as is.
pub fn transform_anylabeling(
    file: &AnyLabelingFile,
    geometry: &VariantGeometry,
    image_path: &str,
) -> LabelOutcome<AnyLabelingFile> {
    let axis_aligned = geometry.matrix.preserves_axis_alignment();
    let mut out = file.clone();
    out.shapes.clear();
    out.image_path = image_path.to_string();
    out.image_width = Some(geometry.width);
    out.image_height = Some(geometry.height);
    if let Some(data) = out.extra.get_mut("imageData") {
        *data = Value::Null;
    }

    let mut transformed = 0;
    let mut zero_area = 0;
    for shape in &file.shapes {
        let mut shape = shape.clone();
        let points = transform_points(&shape.points, &geometry.matrix);

        let kept = match shape.shape_type.as_str() {
            SHAPE_ROTATION if points.len() == 4 => oriented_from(&points)
                .map(|obb| shape.set_oriented(&obb))
                .is_some(),
            SHAPE_RECTANGLE if axis_aligned && !points.is_empty() => {
                let rect = fit_axis_aligned_box(&points).with_min_extent(1.0);
                if rect.area() > MIN_AREA {
                    shape.set_rect(&rect);
                    true
                } else {
                    false
                }
            }
            SHAPE_RECTANGLE if !points.is_empty() => oriented_from(&points)
                .map(|obb| shape.set_oriented(&obb))
                .is_some(),
            _ => {
                shape.points = points;
                true
            }
        };

        if kept {
            out.shapes.push(shape);
            transformed += 1;
        } else {
            tracing::debug!(label = %shape.label, "dropping zero-area shape");
            zero_area += 1;
        }
    }

    LabelOutcome {
        labels: out,
        transformed,
        zero_area,
    }
}
