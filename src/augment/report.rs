use std::fmt;

/// Summary of one augmentation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub images: usize,
    /// Images whose size could not be determined.
    pub images_failed: usize,
    /// Images with neither a `.txt` nor a `.json` label file.
    pub missing_labels: usize,
    /// Label files that could not be read or parsed.
    pub labels_unreadable: usize,
    pub variants: usize,
    pub label_files_written: usize,
    pub boxes_transformed: usize,
    /// Malformed label lines, counted once per source file.
    pub lines_skipped: usize,
    pub zero_area: usize,
    /// Axis-aligned label files left out of rotated variants.
    pub hbb_files_skipped: usize,
}

impl fmt::Display for TransformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transformed {} image(s) into {} variant(s)",
            self.images, self.variants
        )?;
        writeln!(f, "  label files written: {}", self.label_files_written)?;
        writeln!(f, "  boxes transformed:   {}", self.boxes_transformed)?;
        writeln!(
            f,
            "  boxes skipped:       {} malformed, {} zero-area",
            self.lines_skipped, self.zero_area
        )?;
        if self.hbb_files_skipped > 0 {
            writeln!(
                f,
                "  box label files not rotated: {} (use --allow-hbb-rotation)",
                self.hbb_files_skipped
            )?;
        }
        if self.missing_labels > 0 {
            writeln!(f, "  images without labels: {}", self.missing_labels)?;
        }
        if self.labels_unreadable > 0 {
            writeln!(f, "  unreadable label files: {}", self.labels_unreadable)?;
        }
        if self.images_failed > 0 {
            writeln!(f, "  unreadable images:   {}", self.images_failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_lines_only_when_nonzero() {
        let report = TransformReport {
            images: 2,
            variants: 4,
            label_files_written: 4,
            boxes_transformed: 10,
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.starts_with("Transformed 2 image(s) into 4 variant(s)\n"));
        assert!(text.contains("boxes skipped:       0 malformed, 0 zero-area"));
        assert!(!text.contains("allow-hbb-rotation"));
        assert!(!text.contains("unreadable"));

        let text = TransformReport {
            hbb_files_skipped: 3,
            ..report
        }
        .to_string();
        assert!(text.contains("box label files not rotated: 3"));

        let text = TransformReport {
            labels_unreadable: 1,
            ..Default::default()
        }
        .to_string();
        assert!(text.contains("unreadable label files: 1"));
    }
}
