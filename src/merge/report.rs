use std::fmt;

use super::MergeCluster;

/// Per-file merge summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub input_boxes: usize,
    pub output_boxes: usize,
    /// Output boxes built from more than one input box.
    pub merged_groups: usize,
    /// Input boxes that ended up inside a merged group.
    pub merged_boxes: usize,
    /// Shapes the reader dropped before merging.
    pub skipped: usize,
}

impl MergeReport {
    pub fn from_clusters(input_boxes: usize, clusters: &[MergeCluster]) -> Self {
        let merged: Vec<&MergeCluster> = clusters.iter().filter(|c| !c.is_singleton()).collect();
        Self {
            input_boxes,
            output_boxes: clusters.len(),
            merged_groups: merged.len(),
            merged_boxes: merged.iter().map(|c| c.members.len()).sum(),
            skipped: 0,
        }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn changed(&self) -> bool {
        self.merged_groups > 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} boxes -> {} boxes ({} merged group(s) covering {} boxes",
            self.input_boxes, self.output_boxes, self.merged_groups, self.merged_boxes
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Rect;

    fn cluster(members: Vec<usize>) -> MergeCluster {
        MergeCluster {
            members,
            rect: Rect::from_xyxy(0.0, 0.0, 1.0, 1.0),
            label: "t".into(),
            text: None,
            confidence: None,
            class_id: None,
        }
    }

    #[test]
    fn counts_groups_and_members() {
        let report = MergeReport::from_clusters(
            5,
            &[cluster(vec![0, 2]), cluster(vec![1]), cluster(vec![3, 4])],
        )
        .with_skipped(1);
        assert_eq!(report.output_boxes, 3);
        assert_eq!(report.merged_groups, 2);
        assert_eq!(report.merged_boxes, 4);
        assert!(report.changed());
        assert_eq!(
            report.to_string(),
            "5 boxes -> 3 boxes (2 merged group(s) covering 4 boxes, 1 skipped)"
        );
    }
}
