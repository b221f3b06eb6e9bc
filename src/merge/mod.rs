//! Region merge engine.
//!
//! Coalesces fragmented text-region detections into logical blocks. Pairs
//! that pass the label gate and the direction-aware adjacency test are
//! joined with a disjoint-set forest, so transitively connected fragments
//! end up in one cluster regardless of discovery order. Passes repeat on
//! the synthesized clusters until nothing else joins, because a merged
//! rectangle can reach a box that neither fragment reached alone.

mod config;
mod report;
mod union_find;

pub use config::{
    AxisThresholds, Direction, LabelMergeStrategy, LabelPolicy, MergeConfig, MergeMode,
    MergeSettings, ReadingDirection,
};
pub use report::MergeReport;
pub use union_find::UnionFind;

use std::cmp::Ordering;

use crate::ir::{DetectionBox, Pixel, Rect};

/// One output region and the input boxes it absorbed.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeCluster {
    /// Indices into the input slice, ascending.
    pub members: Vec<usize>,
    /// Axis-aligned union of the member extents.
    pub rect: Rect<Pixel>,
    pub label: String,
    pub text: Option<String>,
    /// Highest member confidence.
    pub confidence: Option<f64>,
    /// Class id of the first member.
    pub class_id: Option<u32>,
}

impl MergeCluster {
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Converts the cluster back into a box.
    ///
    /// Singletons come back exactly as they went in, oriented shapes
    /// included. Merged clusters become plain rectangles that keep the
    /// first member's attributes.
    pub fn to_box(&self, inputs: &[DetectionBox]) -> DetectionBox {
        let first = &inputs[self.members[0]];
        if self.is_singleton() {
            return first.clone();
        }
        DetectionBox {
            label: self.label.clone(),
            class_id: self.class_id,
            confidence: self.confidence,
            shape: self.rect.into(),
            text: self.text.clone(),
            attributes: first.attributes.clone(),
        }
    }
}

/// Ratio of `overlap` to the narrower of two extents, in percent.
///
/// `None` when the narrower extent is empty; such a box overlaps nothing.
#[inline]
fn overlap_percent(overlap: f64, extent_a: f64, extent_b: f64, epsilon: f64) -> Option<f64> {
    let narrower = extent_a.min(extent_b);
    (narrower > 0.0).then(|| (overlap + epsilon) / narrower * 100.0)
}

/// Geometric half of the merge predicate. Labels are not consulted.
///
/// Containment and (optionally) any contact short-circuit to `true`.
/// Otherwise the boxes must overlap across the stacking axis by at least
/// `min_overlap_ratio` percent of the narrower box and sit no more than
/// `max_gap` apart along it.
pub fn is_adjacent(a: &Rect<Pixel>, b: &Rect<Pixel>, config: &MergeConfig) -> bool {
    if config.merge_contained && (a.contains(b) || b.contains(a)) {
        return true;
    }
    if config.merge_any_overlap && a.touches(b) {
        return true;
    }

    let (ratio, gap) = match config.direction {
        Direction::Vertical => (
            overlap_percent(a.overlap_x(b), a.width(), b.width(), config.overlap_epsilon),
            a.gap_y(b),
        ),
        Direction::Horizontal => (
            overlap_percent(a.overlap_y(b), a.height(), b.height(), config.overlap_epsilon),
            a.gap_x(b),
        ),
    };

    let Some(ratio) = ratio else {
        return false;
    };
    let gap_ok = if config.allow_negative_gap {
        gap <= config.max_gap
    } else {
        (0.0..=config.max_gap).contains(&gap)
    };
    ratio >= config.min_overlap_ratio && gap_ok
}

/// Full merge predicate: label gate first, then geometry.
pub fn should_merge(a: &DetectionBox, b: &DetectionBox, config: &MergeConfig) -> bool {
    config.labels.compatible(&a.label, &b.label) && is_adjacent(&a.rect(), &b.rect(), config)
}

/// A cluster in progress.
struct Node<'a> {
    members: Vec<usize>,
    rect: Rect<Pixel>,
    gate_label: &'a str,
}

impl Node<'_> {
    fn joinable(&self, other: &Self, config: &MergeConfig) -> bool {
        config.labels.compatible(self.gate_label, other.gate_label)
            && is_adjacent(&self.rect, &other.rect, config)
    }
}

/// Clusters `boxes` under one direction and synthesizes a region per
/// cluster, ordered by each cluster's smallest member index.
pub fn merge_regions(boxes: &[DetectionBox], config: &MergeConfig) -> Vec<MergeCluster> {
    let mut nodes: Vec<Node<'_>> = boxes
        .iter()
        .enumerate()
        .map(|(idx, b)| Node {
            members: vec![idx],
            rect: b.rect(),
            gate_label: b.label.as_str(),
        })
        .collect();

    let mut pass = 0usize;
    loop {
        let mut forest = UnionFind::new(nodes.len());
        let mut joined = false;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if nodes[i].joinable(&nodes[j], config) && forest.union(i, j) {
                    tracing::debug!(
                        pass,
                        a = ?nodes[i].members,
                        b = ?nodes[j].members,
                        direction = %config.direction,
                        "joining regions"
                    );
                    joined = true;
                }
            }
        }
        if !joined {
            break;
        }
        pass += 1;

        nodes = forest
            .groups()
            .into_iter()
            .map(|group| {
                let mut members: Vec<usize> = group
                    .iter()
                    .flat_map(|&n| nodes[n].members.iter().copied())
                    .collect();
                members.sort_unstable();
                let rect = group
                    .iter()
                    .map(|&n| nodes[n].rect)
                    .reduce(|acc, r| acc.union(&r))
                    .unwrap_or_default();
                Node {
                    gate_label: boxes[members[0]].label.as_str(),
                    members,
                    rect,
                }
            })
            .collect();
    }

    nodes
        .into_iter()
        .map(|node| synthesize(boxes, node.members, node.rect, config))
        .collect()
}

fn synthesize(
    boxes: &[DetectionBox],
    members: Vec<usize>,
    rect: Rect<Pixel>,
    config: &MergeConfig,
) -> MergeCluster {
    let first = &boxes[members[0]];
    let confidence = members
        .iter()
        .filter_map(|&m| boxes[m].confidence)
        .reduce(f64::max);
    let text = if config.merge_text && members.len() > 1 {
        merge_text(boxes, &members, config)
    } else {
        first.text.clone()
    };
    MergeCluster {
        label: merge_label(boxes, &members, config),
        text,
        confidence,
        class_id: first.class_id,
        rect,
        members,
    }
}

fn merge_label(boxes: &[DetectionBox], members: &[usize], config: &MergeConfig) -> String {
    let labels: Vec<&str> = members.iter().map(|&m| boxes[m].label.as_str()).collect();
    let first = labels[0];
    match config.label_strategy {
        LabelMergeStrategy::First => first.to_string(),
        LabelMergeStrategy::Combine => {
            let mut distinct: Vec<&str> = Vec::with_capacity(labels.len());
            for label in &labels {
                if !distinct.contains(label) {
                    distinct.push(*label);
                }
            }
            distinct.join(&config.label_separator)
        }
        LabelMergeStrategy::PreferNonDefault => labels
            .iter()
            .find(|l| !config.default_labels.contains(**l))
            .unwrap_or(&first)
            .to_string(),
        LabelMergeStrategy::PreferShorter => labels
            .iter()
            // min_by_key keeps the first of equal keys
            .min_by_key(|l| l.chars().count())
            .unwrap_or(&first)
            .to_string(),
    }
}

fn merge_text(boxes: &[DetectionBox], members: &[usize], config: &MergeConfig) -> Option<String> {
    let mut ordered: Vec<usize> = members
        .iter()
        .copied()
        .filter(|&m| boxes[m].non_empty_text().is_some())
        .collect();
    if ordered.is_empty() {
        return boxes[members[0]].text.clone();
    }
    ordered.sort_by(|&a, &b| {
        reading_order(&boxes[a], &boxes[b], config.reading_direction).then(a.cmp(&b))
    });
    let parts: Vec<&str> = ordered
        .iter()
        .filter_map(|&m| boxes[m].non_empty_text())
        .collect();
    Some(parts.join(config.text_separator()))
}

fn reading_order(a: &DetectionBox, b: &DetectionBox, direction: ReadingDirection) -> Ordering {
    match direction {
        ReadingDirection::VerticalRtl => b.rect().xmin().total_cmp(&a.rect().xmin()),
        ReadingDirection::HorizontalTtb => a.rect().ymin().total_cmp(&b.rect().ymin()),
    }
}

/// Runs every pass of `settings.mode` in order, feeding each pass the
/// boxes produced by the previous one.
///
/// Returned clusters index into `boxes`, so a member list spans every pass.
pub fn merge_in_passes(boxes: &[DetectionBox], settings: &MergeSettings) -> Vec<MergeCluster> {
    let mut current: Vec<DetectionBox> = boxes.to_vec();
    let mut origins: Vec<Vec<usize>> = (0..boxes.len()).map(|i| vec![i]).collect();

    for &direction in settings.mode.passes() {
        let config = settings.config_for(direction);
        let clusters = merge_regions(&current, &config);
        tracing::debug!(
            direction = %direction,
            before = current.len(),
            after = clusters.len(),
            "merge pass finished"
        );
        origins = clusters
            .iter()
            .map(|c| {
                let mut merged: Vec<usize> = c
                    .members
                    .iter()
                    .flat_map(|&m| origins[m].iter().copied())
                    .collect();
                merged.sort_unstable();
                merged
            })
            .collect();
        current = clusters.iter().map(|c| c.to_box(&current)).collect();
    }

    current
        .into_iter()
        .zip(origins)
        .map(|(b, members)| MergeCluster {
            rect: b.rect(),
            label: b.label,
            text: b.text,
            confidence: b.confidence,
            class_id: b.class_id,
            members,
        })
        .collect()
}

/// Merges `boxes` under `settings` and returns the output boxes and a
/// summary of what happened.
pub fn merge_boxes(
    boxes: &[DetectionBox],
    settings: &MergeSettings,
) -> (Vec<DetectionBox>, MergeReport) {
    let clusters = merge_in_passes(boxes, settings);
    let report = MergeReport::from_clusters(boxes.len(), &clusters);
    let merged = clusters.iter().map(|c| c.to_box(boxes)).collect();
    (merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OrientedBox;

    fn ltwh(label: &str, l: f64, t: f64, w: f64, h: f64) -> DetectionBox {
        DetectionBox::new(label, Rect::<Pixel>::from_ltwh(l, t, w, h))
    }

    fn vertical(max_gap: f64, min_overlap_ratio: f64) -> MergeConfig {
        MergeConfig {
            direction: Direction::Vertical,
            max_gap,
            min_overlap_ratio,
            ..Default::default()
        }
    }

    #[test]
    fn stacked_lines_merge_into_their_union() {
        let boxes = vec![
            ltwh("balloon", 0.0, 0.0, 50.0, 20.0),
            ltwh("balloon", 2.0, 22.0, 48.0, 20.0),
        ];
        let clusters = merge_regions(&boxes, &vertical(5.0, 50.0));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[0].rect.to_ltwh(), (0.0, 0.0, 50.0, 42.0));
    }

    #[test]
    fn gap_beyond_threshold_keeps_boxes_apart() {
        let boxes = vec![
            ltwh("balloon", 0.0, 0.0, 50.0, 20.0),
            ltwh("balloon", 2.0, 22.0, 48.0, 20.0),
        ];
        let clusters = merge_regions(&boxes, &vertical(1.0, 50.0));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].rect, boxes[0].rect());
        assert_eq!(clusters[1].rect, boxes[1].rect());
    }

    #[test]
    fn zero_extent_box_never_reaches_across_the_page() {
        let boxes = vec![
            DetectionBox::new("balloon", Rect::<Pixel>::from_xyxy(0.0, 0.0, 50.0, 20.0)),
            DetectionBox::new("balloon", Rect::<Pixel>::from_xyxy(1000.0, 22.0, 1000.0, 40.0)),
        ];
        let config = MergeConfig::default();
        assert!(!is_adjacent(&boxes[0].rect(), &boxes[1].rect(), &config));
        assert_eq!(merge_regions(&boxes, &config).len(), 2);

        let flat = Rect::<Pixel>::from_xyxy(0.0, 22.0, 50.0, 22.0);
        let horizontal = MergeConfig {
            direction: Direction::Horizontal,
            ..Default::default()
        };
        assert!(!is_adjacent(&boxes[0].rect(), &flat, &horizontal));
    }

    #[test]
    fn contained_box_is_absorbed_regardless_of_thresholds() {
        let boxes = vec![
            ltwh("balloon", 0.0, 0.0, 100.0, 100.0),
            DetectionBox::new("balloon", Rect::<Pixel>::from_xyxy(10.0, 10.0, 20.0, 20.0)),
        ];
        let config = MergeConfig {
            max_gap: -1000.0,
            min_overlap_ratio: 100.0,
            ..Default::default()
        };
        let clusters = merge_regions(&boxes, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].rect, boxes[0].rect());
    }

    #[test]
    fn chain_merges_transitively() {
        // A-B and B-C are 4px apart; A-C are 28px apart.
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 40.0, 20.0),
            ltwh("t", 0.0, 24.0, 40.0, 20.0),
            ltwh("t", 0.0, 48.0, 40.0, 20.0),
        ];
        let config = vertical(5.0, 50.0);
        assert!(!is_adjacent(&boxes[0].rect(), &boxes[2].rect(), &config));
        let clusters = merge_regions(&boxes, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2]);
    }

    #[test]
    fn merged_union_reaches_a_third_box() {
        // The third box overlaps the union's width enough only once the
        // first two are merged.
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 20.0, 10.0),
            ltwh("t", 20.0, 0.0, 20.0, 10.0),
            ltwh("t", 5.0, 12.0, 30.0, 10.0),
        ];
        let config = MergeConfig {
            merge_any_overlap: true,
            ..vertical(3.0, 90.0)
        };
        assert!(!is_adjacent(&boxes[0].rect(), &boxes[2].rect(), &config));
        assert!(!is_adjacent(&boxes[1].rect(), &boxes[2].rect(), &config));
        let clusters = merge_regions(&boxes, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].rect.to_ltwh(), (0.0, 0.0, 40.0, 22.0));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 40.0, 20.0),
            ltwh("t", 0.0, 24.0, 40.0, 20.0),
            ltwh("t", 200.0, 0.0, 40.0, 20.0),
        ];
        let config = vertical(5.0, 50.0);
        let first = merge_regions(&boxes, &config);
        let merged: Vec<DetectionBox> = first.iter().map(|c| c.to_box(&boxes)).collect();
        let second = merge_regions(&merged, &config);
        assert_eq!(second.len(), merged.len());
        assert!(second.iter().all(MergeCluster::is_singleton));
    }

    #[test]
    fn empty_and_single_inputs() {
        assert!(merge_regions(&[], &MergeConfig::default()).is_empty());

        let obb = OrientedBox::<Pixel>::new([
            [10.0, 0.0].into(),
            [20.0, 10.0].into(),
            [10.0, 20.0].into(),
            [0.0, 10.0].into(),
        ]);
        let only = vec![DetectionBox::new("balloon", obb).with_text("hi")];
        let clusters = merge_regions(&only, &MergeConfig::default());
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_singleton());
        assert_eq!(clusters[0].to_box(&only), only[0]);
    }

    #[test]
    fn label_gate_runs_before_geometry() {
        let boxes = vec![
            ltwh("balloon", 0.0, 0.0, 100.0, 100.0),
            ltwh("other", 10.0, 10.0, 10.0, 10.0),
        ];
        let clusters = merge_regions(&boxes, &MergeConfig::default());
        assert_eq!(clusters.len(), 2);

        let mut config = MergeConfig::default();
        config.labels.require_same_label = false;
        assert_eq!(merge_regions(&boxes, &config).len(), 1);

        config.labels.exclude.insert("other".to_string());
        assert_eq!(merge_regions(&boxes, &config).len(), 2);
    }

    #[test]
    fn label_strategies() {
        let boxes = vec![
            ltwh("label", 0.0, 0.0, 40.0, 20.0),
            ltwh("balloon2", 0.0, 22.0, 40.0, 20.0),
            ltwh("balloon", 0.0, 44.0, 40.0, 20.0),
            ltwh("balloon2", 0.0, 66.0, 40.0, 20.0),
        ];
        let mut config = vertical(5.0, 50.0);
        config.labels.require_same_label = false;

        let label_with = |strategy| {
            let config = MergeConfig {
                label_strategy: strategy,
                ..config.clone()
            };
            let clusters = merge_regions(&boxes, &config);
            assert_eq!(clusters.len(), 1);
            clusters[0].label.clone()
        };

        assert_eq!(label_with(LabelMergeStrategy::First), "label");
        assert_eq!(label_with(LabelMergeStrategy::Combine), "label+balloon2+balloon");
        assert_eq!(label_with(LabelMergeStrategy::PreferNonDefault), "balloon2");
        assert_eq!(label_with(LabelMergeStrategy::PreferShorter), "label");

        config.labels.exclude.insert("label".to_string());
        let clusters = merge_regions(
            &boxes,
            &MergeConfig {
                label_strategy: LabelMergeStrategy::PreferShorter,
                ..config
            },
        );
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].label, "balloon");
    }

    #[test]
    fn vertical_text_reads_right_to_left() {
        // Two CJK columns, the right one first.
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 20.0, 100.0).with_text("左"),
            ltwh("t", 24.0, 0.0, 20.0, 100.0).with_text("右"),
        ];
        let config = MergeConfig {
            direction: Direction::Horizontal,
            max_gap: 10.0,
            min_overlap_ratio: 10.0,
            merge_text: true,
            ..Default::default()
        };
        let clusters = merge_regions(&boxes, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].text.as_deref(), Some("右左"));
    }

    #[test]
    fn horizontal_text_reads_top_to_bottom() {
        let boxes = vec![
            ltwh("t", 0.0, 30.0, 80.0, 20.0).with_text("second"),
            ltwh("t", 0.0, 0.0, 80.0, 25.0).with_text("first"),
            ltwh("t", 0.0, 55.0, 80.0, 20.0),
        ];
        let config = MergeConfig {
            merge_text: true,
            reading_direction: ReadingDirection::HorizontalTtb,
            ..vertical(10.0, 50.0)
        };
        let clusters = merge_regions(&boxes, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].text.as_deref(), Some("first\nsecond"));

        let without = merge_regions(&boxes, &vertical(10.0, 50.0));
        assert_eq!(without[0].text.as_deref(), Some("second"));
    }

    #[test]
    fn strict_gap_rejects_overlapping_boxes() {
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 40.0, 20.0),
            ltwh("t", 5.0, 15.0, 40.0, 20.0),
        ];
        let mut config = vertical(5.0, 50.0);
        assert!(is_adjacent(&boxes[0].rect(), &boxes[1].rect(), &config));
        config.allow_negative_gap = false;
        assert!(!is_adjacent(&boxes[0].rect(), &boxes[1].rect(), &config));
    }

    #[test]
    fn passes_run_in_order_and_report_original_members() {
        // Two columns of two lines each; vertical joins lines, horizontal
        // then joins the columns.
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 30.0, 20.0),
            ltwh("t", 40.0, 0.0, 30.0, 20.0),
            ltwh("t", 0.0, 22.0, 30.0, 20.0),
            ltwh("t", 40.0, 22.0, 30.0, 20.0),
        ];
        let settings = MergeSettings {
            mode: MergeMode::VerticalThenHorizontal,
            vertical: Some(AxisThresholds {
                max_gap: 5.0,
                min_overlap_ratio: 50.0,
            }),
            horizontal: Some(AxisThresholds {
                max_gap: 15.0,
                min_overlap_ratio: 10.0,
            }),
            base: MergeConfig::default(),
        };
        let clusters = merge_in_passes(&boxes, &settings);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3]);
        assert_eq!(clusters[0].rect.to_ltwh(), (0.0, 0.0, 70.0, 42.0));

        let none = MergeSettings {
            mode: MergeMode::None,
            ..settings
        };
        let (out, report) = merge_boxes(&boxes, &none);
        assert_eq!(out, boxes);
        assert_eq!(report.merged_groups, 0);
    }

    #[test]
    fn confidence_is_the_member_maximum() {
        let boxes = vec![
            ltwh("t", 0.0, 0.0, 40.0, 20.0).with_confidence(0.4).with_class_id(2),
            ltwh("t", 0.0, 22.0, 40.0, 20.0).with_confidence(0.9).with_class_id(3),
        ];
        let clusters = merge_regions(&boxes, &vertical(5.0, 50.0));
        assert_eq!(clusters[0].confidence, Some(0.9));
        assert_eq!(clusters[0].class_id, Some(2));
    }
}
