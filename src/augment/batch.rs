//! Directory-level augmentation run.

use std::path::{Path, PathBuf};

use super::labels::{transform_anylabeling, transform_yolo_rows};
use super::{AugmentOptions, TransformReport, Variant, VariantPlanner};
use crate::error::MangalabelError;
use crate::ir::io_anylabeling::{read_anylabeling_json, write_anylabeling_json, AnyLabelingFile};
use crate::ir::io_yolo::{
    collect_files_with_extensions, discover_layout, read_image_dimensions, read_label_file,
    write_label_file, LabelFormat, IMAGE_EXTENSIONS, LABEL_EXTENSION,
};

const JSON_EXTENSION: &str = "json";

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name of a variant's image: `{stem}_{prefix}.{ext}`.
pub fn variant_image_name(image_path: &Path, variant: &Variant) -> String {
    let stem = variant.output_stem(&file_stem(image_path));
    match image_path.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    }
}

/// Writes transformed label files for every image under `input` into
/// `output`, keeping each image's relative directory.
///
/// YOLO `.txt` and X-AnyLabeling `.json` labels are both handled; either
/// may sit next to the image or, for an `images/` + `labels/` root, under
/// the matching `labels/` path. Image sizes come from file headers.
pub fn transform_dataset(
    input: &Path,
    output: &Path,
    options: &AugmentOptions,
) -> Result<TransformReport, MangalabelError> {
    let layout = discover_layout(input)?;
    let images = collect_files_with_extensions(&layout.images_dir, &IMAGE_EXTENSIONS)?;
    let (txt_root, json_root) = if layout.is_flat() {
        (output.to_path_buf(), output.to_path_buf())
    } else {
        (output.join("labels"), output.join("images"))
    };

    let mut planner = VariantPlanner::new(options);
    let mut report = TransformReport::default();

    for image in images {
        if image.starts_with(output) {
            continue;
        }

        let txt_path = layout.label_path_for(&image, LABEL_EXTENSION);
        let json_path = image.with_extension(JSON_EXTENSION);
        let json_path = if json_path.is_file() {
            json_path
        } else {
            layout.label_path_for(&image, JSON_EXTENSION)
        };

        let unreadable_before = report.labels_unreadable;
        let yolo = txt_path
            .is_file()
            .then(|| read_label_file(&txt_path))
            .and_then(|read| skip_unreadable(read, &txt_path, &mut report));
        let anylabeling = json_path
            .is_file()
            .then(|| read_anylabeling_json(&json_path))
            .and_then(|read| skip_unreadable(read, &json_path, &mut report));

        if yolo.is_none() && anylabeling.is_none() {
            if report.labels_unreadable == unreadable_before {
                tracing::info!(image = %image.display(), "no label file, skipping");
                report.missing_labels += 1;
            }
            continue;
        }

        let (width, height) = match read_image_dimensions(&image) {
            Ok(size) => size,
            Err(err) => match anylabeling.as_ref().and_then(AnyLabelingFile::canvas_size) {
                Some(size) => size,
                None => {
                    tracing::warn!("skipping image: {err}");
                    report.images_failed += 1;
                    continue;
                }
            },
        };

        report.images += 1;
        if let Some(labels) = &yolo {
            report.lines_skipped += labels.skipped;
        }

        let rel_dir = relative_parent(&layout.images_dir, &image);
        tracing::info!(image = %image.display(), width, height, "augmenting");

        for variant in planner.next_image() {
            let geometry = variant.geometry(width, height, options.border);
            let image_name = variant_image_name(&image, &variant);
            let out_stem = variant.output_stem(&file_stem(&image));
            report.variants += 1;

            if let Some(labels) = &yolo {
                let rotates_boxes = labels.format == Some(LabelFormat::Hbb)
                    && !geometry.matrix.preserves_axis_alignment();
                if rotates_boxes && !options.allow_hbb_rotation {
                    report.hbb_files_skipped += 1;
                } else {
                    let outcome = transform_yolo_rows(&labels.rows, &geometry, width, height);
                    let path = txt_root
                        .join(&rel_dir)
                        .join(format!("{out_stem}.{LABEL_EXTENSION}"));
                    write_label_file(&path, &outcome.labels)?;
                    report.label_files_written += 1;
                    report.boxes_transformed += outcome.transformed;
                    report.zero_area += outcome.zero_area;
                }
            }

            if let Some(file) = &anylabeling {
                let outcome = transform_anylabeling(file, &geometry, &image_name);
                let path = json_root
                    .join(&rel_dir)
                    .join(format!("{out_stem}.{JSON_EXTENSION}"));
                write_anylabeling_json(&path, &outcome.labels)?;
                report.label_files_written += 1;
                report.boxes_transformed += outcome.transformed;
                report.zero_area += outcome.zero_area;
            }
        }
    }

    Ok(report)
}

/// Label files that fail to load are logged and counted, not fatal.
fn skip_unreadable<T>(
    read: Result<T, MangalabelError>,
    path: &Path,
    report: &mut TransformReport,
) -> Option<T> {
    match read {
        Ok(file) => Some(file),
        Err(err) => {
            tracing::warn!(path = %path.display(), "skipping unreadable label file: {err}");
            report.labels_unreadable += 1;
            None
        }
    }
}

fn relative_parent(root: &Path, path: &Path) -> PathBuf {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
