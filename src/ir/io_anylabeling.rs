//! X-AnyLabeling JSON annotation files.
//!
//! Only the fields the tools touch are typed. Everything else (`version`,
//! `flags`, `imageData`, per-shape `group_id`, `score`, `attributes`, ...)
//! is kept in flattened maps so a read-modify-write cycle leaves it intact.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BoxShape, DetectionBox, OrientedBox, Pixel, Point, Rect};
use crate::error::MangalabelError;
use crate::merge::{merge_in_passes, MergeReport, MergeSettings};
use crate::transform::fit_axis_aligned_box;

pub const SHAPE_RECTANGLE: &str = "rectangle";
pub const SHAPE_ROTATION: &str = "rotation";
pub const SHAPE_POLYGON: &str = "polygon";

/// One annotation file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnyLabelingFile {
    #[serde(default)]
    pub shapes: Vec<AnyLabelingShape>,

    #[serde(rename = "imagePath", default)]
    pub image_path: String,

    #[serde(rename = "imageHeight", default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,

    #[serde(rename = "imageWidth", default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One shape inside a file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnyLabelingShape {
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub points: Vec<Point<Pixel>>,

    #[serde(default = "default_shape_type")]
    pub shape_type: String,

    /// Recognized text for text-region shapes.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_shape_type() -> String {
    SHAPE_POLYGON.to_string()
}

impl AnyLabelingShape {
    pub fn new(label: impl Into<String>, shape_type: &str, points: Vec<Point<Pixel>>) -> Self {
        Self {
            label: label.into(),
            points,
            shape_type: shape_type.to_string(),
            description: None,
            extra: Map::new(),
        }
    }

    pub fn is_rotation(&self) -> bool {
        self.shape_type == SHAPE_ROTATION
    }

    /// Detector score stored by X-AnyLabeling's auto-labeling.
    pub fn score(&self) -> Option<f64> {
        self.extra.get("score").and_then(Value::as_f64)
    }

    /// Box view of the shape, or `None` for shapes without usable points
    /// or kinds that are not regions (points, lines, circles).
    pub fn to_detection_box(&self) -> Option<DetectionBox> {
        if self.points.is_empty() || !self.points.iter().all(Point::is_finite) {
            return None;
        }

        let shape: BoxShape = match self.shape_type.as_str() {
            SHAPE_ROTATION if self.points.len() == 4 => OrientedBox::new([
                self.points[0],
                self.points[1],
                self.points[2],
                self.points[3],
            ])
            .into(),
            SHAPE_RECTANGLE if self.points.len() >= 2 => fit_axis_aligned_box(&self.points).into(),
            SHAPE_POLYGON if self.points.len() >= 3 => fit_axis_aligned_box(&self.points).into(),
            _ => return None,
        };

        let mut det = DetectionBox::new(self.label.clone(), shape);
        det.text = self.description.clone();
        det.confidence = self.score();
        Some(det)
    }

    /// Replaces the geometry with an axis-aligned rectangle.
    pub fn set_rect(&mut self, rect: &Rect<Pixel>) {
        self.points = rect.corners().to_vec();
        self.shape_type = SHAPE_RECTANGLE.to_string();
    }

    /// Replaces the geometry with an oriented box.
    pub fn set_oriented(&mut self, obb: &OrientedBox<Pixel>) {
        self.points = obb.corners.to_vec();
        self.shape_type = SHAPE_ROTATION.to_string();
    }
}

impl AnyLabelingFile {
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        Some((self.image_width?, self.image_height?))
    }

    /// Merges the region shapes in place.
    ///
    /// Shapes that are not regions, zero-area regions included, are kept
    /// after the merged ones and counted as skipped. A merged shape starts
    /// as a copy of its first member, so member extras such as `group_id`
    /// follow the first member. Its `score` is the members' maximum.
    pub fn merge_shapes(&mut self, settings: &MergeSettings) -> MergeReport {
        let mut regions: Vec<(AnyLabelingShape, DetectionBox)> = Vec::new();
        let mut passthrough: Vec<AnyLabelingShape> = Vec::new();
        for shape in self.shapes.drain(..) {
            match shape.to_detection_box() {
                Some(det) if det.rect().area() > 0.0 => regions.push((shape, det)),
                _ => {
                    tracing::warn!(
                        label = %shape.label,
                        shape_type = %shape.shape_type,
                        "shape is not a mergeable region"
                    );
                    passthrough.push(shape);
                }
            }
        }

        let boxes: Vec<DetectionBox> = regions.iter().map(|(_, det)| det.clone()).collect();
        let clusters = merge_in_passes(&boxes, settings);
        let report =
            MergeReport::from_clusters(boxes.len(), &clusters).with_skipped(passthrough.len());

        for cluster in &clusters {
            let mut shape = regions[cluster.members[0]].0.clone();
            if !cluster.is_singleton() {
                shape.set_rect(&cluster.rect);
                shape.label = cluster.label.clone();
                shape.description = cluster.text.clone();
                if let Some(score) = cluster.confidence {
                    shape.extra.insert("score".to_string(), Value::from(score));
                }
            }
            self.shapes.push(shape);
        }
        self.shapes.extend(passthrough);

        report
    }
}

pub fn parse_anylabeling_str(json: &str, path: &Path) -> Result<AnyLabelingFile, MangalabelError> {
    serde_json::from_str(json).map_err(|source| MangalabelError::LabelJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_anylabeling_json(path: &Path) -> Result<AnyLabelingFile, MangalabelError> {
    let data = fs::read_to_string(path).map_err(MangalabelError::Io)?;
    parse_anylabeling_str(&data, path)
}

pub fn write_anylabeling_json(path: &Path, file: &AnyLabelingFile) -> Result<(), MangalabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(MangalabelError::Io)?;
    }
    let json =
        serde_json::to_string_pretty(file).map_err(|source| MangalabelError::LabelJsonWrite {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, json).map_err(MangalabelError::Io)
}

/// Fuzz-only entrypoint for document parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_anylabeling_json(input: &[u8]) -> Result<(), MangalabelError> {
    let file: AnyLabelingFile =
        serde_json::from_slice(input).map_err(|source| MangalabelError::LabelJsonParse {
            path: "<fuzz>".into(),
            source,
        })?;
    for shape in &file.shapes {
        let _ = shape.to_detection_box();
    }
    Ok(())
}
