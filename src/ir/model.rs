//! The normalized box record exchanged between readers, engines and writers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::obb::OrientedBox;
use super::rect::Rect;
use super::space::Pixel;

/// Geometry of a detection in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "geometry", rename_all = "snake_case")]
pub enum BoxShape {
    Rect(Rect<Pixel>),
    Oriented(OrientedBox<Pixel>),
}

impl BoxShape {
    /// Axis-aligned extent of the shape.
    pub fn bounding_rect(&self) -> Rect<Pixel> {
        match self {
            BoxShape::Rect(rect) => *rect,
            BoxShape::Oriented(obb) => obb.bounding_rect(),
        }
    }

    pub fn is_oriented(&self) -> bool {
        matches!(self, BoxShape::Oriented(_))
    }
}

impl From<Rect<Pixel>> for BoxShape {
    fn from(rect: Rect<Pixel>) -> Self {
        BoxShape::Rect(rect)
    }
}

impl From<OrientedBox<Pixel>> for BoxShape {
    fn from(obb: OrientedBox<Pixel>) -> Self {
        BoxShape::Oriented(obb)
    }
}

/// One labeled region: a detector hit, an annotation shape, or a label row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// Label name. YOLO rows without a class map use the class id as text.
    pub label: String,

    /// Numeric class id when the source format has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,

    /// Detector confidence, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    pub shape: BoxShape,

    /// Recognized or translated text attached to the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Format-specific fields carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl DetectionBox {
    pub fn new(label: impl Into<String>, shape: impl Into<BoxShape>) -> Self {
        Self {
            label: label.into(),
            class_id: None,
            confidence: None,
            shape: shape.into(),
            text: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_class_id(mut self, class_id: u32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Axis-aligned extent, which is what the merge engine reasons about.
    #[inline]
    pub fn rect(&self) -> Rect<Pixel> {
        self.shape.bounding_rect()
    }

    /// Text if present and non-empty.
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}
