//! YOLO label files: axis-aligned (`class cx cy w h`) and oriented
//! (`class x1 y1 x2 y2 x3 y3 x4 y4`) rows, all normalized to `[0, 1]`.
//!
//! Reading is lenient per line: a malformed row is logged and skipped so
//! one bad line does not cost the whole file. The row format of a file is
//! decided by its first parseable row.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{BoxShape, DetectionBox, Normalized, OrientedBox, Point, Rect};
use crate::error::MangalabelError;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "png", "jpeg", "bmp", "webp", "gif"];
pub const LABEL_EXTENSION: &str = "txt";

const HBB_TOKENS: usize = 5;
const OBB_TOKENS: usize = 9;

/// Row layout of a label file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelFormat {
    /// `class cx cy w h`
    Hbb,
    /// `class x1 y1 x2 y2 x3 y3 x4 y4`
    Obb,
}

/// Geometry of one label row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum YoloShape {
    Hbb(Rect<Normalized>),
    Obb(OrientedBox<Normalized>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloRow {
    pub class_id: u32,
    pub shape: YoloShape,
}

impl YoloRow {
    pub fn format(&self) -> LabelFormat {
        match self.shape {
            YoloShape::Hbb(_) => LabelFormat::Hbb,
            YoloShape::Obb(_) => LabelFormat::Obb,
        }
    }

    /// Pixel-space box labeled with the class id.
    pub fn to_detection_box(&self, width: f64, height: f64) -> DetectionBox {
        let shape: BoxShape = match self.shape {
            YoloShape::Hbb(rect) => rect.to_pixel(width, height).into(),
            YoloShape::Obb(obb) => obb.to_pixel(width, height).into(),
        };
        DetectionBox::new(self.class_id.to_string(), shape).with_class_id(self.class_id)
    }
}

/// Parsed contents of one label file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YoloLabelFile {
    /// `None` for a file without a single parseable row.
    pub format: Option<LabelFormat>,
    pub rows: Vec<YoloRow>,
    /// Lines dropped as malformed or not matching the file's format.
    pub skipped: usize,
}

/// Parse one label line. Blank lines yield `Ok(None)`.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<YoloRow>, MangalabelError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Bounded so a pathological line cannot allocate without limit.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(OBB_TOKENS + 1).collect();

    let parse_err = |message: String| MangalabelError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message,
    };

    if tokens.len() != HBB_TOKENS && tokens.len() < OBB_TOKENS {
        return Err(parse_err(format!(
            "expected {HBB_TOKENS} tokens for a box or {OBB_TOKENS} for an oriented box, found {}",
            tokens.len()
        )));
    }

    let class_id = tokens[0].parse::<u32>().map_err(|_| {
        parse_err(format!(
            "invalid class_id '{}'; expected non-negative integer",
            tokens[0]
        ))
    })?;

    let mut values = [0.0f64; OBB_TOKENS - 1];
    let count = if tokens.len() == HBB_TOKENS {
        HBB_TOKENS - 1
    } else {
        OBB_TOKENS - 1
    };
    for (slot, raw) in values.iter_mut().zip(&tokens[1..=count]) {
        *slot = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                parse_err(format!("invalid coordinate '{raw}'; expected a finite number"))
            })?;
    }

    let shape = if count == HBB_TOKENS - 1 {
        YoloShape::Hbb(Rect::from_cxcywh(values[0], values[1], values[2], values[3]))
    } else {
        let corner = |i: usize| Point::new(values[2 * i], values[2 * i + 1]);
        YoloShape::Obb(OrientedBox::new([corner(0), corner(1), corner(2), corner(3)]))
    };

    Ok(Some(YoloRow { class_id, shape }))
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), MangalabelError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

/// Parse a whole label file's text, skipping bad lines.
pub fn parse_label_str(content: &str, file_path: &Path) -> YoloLabelFile {
    let mut file = YoloLabelFile::default();

    for (line_idx, line) in content.lines().enumerate() {
        let row = match parse_label_line(line, file_path, line_idx + 1) {
            Ok(Some(row)) => row,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!("skipping {err}");
                file.skipped += 1;
                continue;
            }
        };

        let format = *file.format.get_or_insert(row.format());
        if row.format() != format {
            tracing::warn!(
                path = %file_path.display(),
                line = line_idx + 1,
                "skipping {:?} row in a {:?} label file",
                row.format(),
                format
            );
            file.skipped += 1;
            continue;
        }
        file.rows.push(row);
    }

    file
}

pub fn read_label_file(path: &Path) -> Result<YoloLabelFile, MangalabelError> {
    let content = fs::read_to_string(path).map_err(MangalabelError::Io)?;
    Ok(parse_label_str(&content, path))
}

/// Render rows with eight decimals, one per line.
pub fn format_rows(rows: &[YoloRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let _ = write!(out, "{}", row.class_id);
        match row.shape {
            YoloShape::Hbb(rect) => {
                let (cx, cy, w, h) = rect.to_cxcywh();
                let _ = write!(out, " {cx:.8} {cy:.8} {w:.8} {h:.8}");
            }
            YoloShape::Obb(obb) => {
                for corner in obb.corners {
                    let _ = write!(out, " {:.8} {:.8}", corner.x, corner.y);
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_label_file(path: &Path, rows: &[YoloRow]) -> Result<(), MangalabelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(MangalabelError::Io)?;
    }
    fs::write(path, format_rows(rows)).map_err(MangalabelError::Io)
}

/// Where images and their label files live.
///
/// Either a YOLO root with `images/` and `labels/` trees, or a flat folder
/// with each label file next to its image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl DatasetLayout {
    pub fn is_flat(&self) -> bool {
        self.images_dir == self.labels_dir
    }

    /// Label path for an image: same relative stem under `labels_dir`.
    pub fn label_path_for(&self, image_path: &Path, extension: &str) -> PathBuf {
        let rel = image_path
            .strip_prefix(&self.images_dir)
            .unwrap_or(image_path);
        self.labels_dir.join(rel).with_extension(extension)
    }
}

pub fn discover_layout(input: &Path) -> Result<DatasetLayout, MangalabelError> {
    if !input.is_dir() {
        return Err(MangalabelError::LayoutInvalid {
            path: input.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let images_dir = input.join("images");
    let labels_dir = input.join("labels");
    if images_dir.is_dir() && labels_dir.is_dir() {
        return Ok(DatasetLayout {
            images_dir,
            labels_dir,
        });
    }

    Ok(DatasetLayout {
        images_dir: input.to_path_buf(),
        labels_dir: input.to_path_buf(),
    })
}

pub fn collect_files_with_extensions(
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, MangalabelError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| MangalabelError::LayoutInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// Image size from the file header, without decoding pixels.
pub fn read_image_dimensions(path: &Path) -> Result<(u32, u32), MangalabelError> {
    let size = imagesize::size(path).map_err(|source| MangalabelError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| MangalabelError::LayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;

    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| MangalabelError::LayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    Ok((width, height))
}

pub fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
