use mangalabel::ir::DetectionBox;
use mangalabel::merge::{is_adjacent, merge_regions, Direction, MergeConfig};
use proptest::prelude::*;

mod proptest_helpers;

fn config(direction: Direction) -> MergeConfig {
    MergeConfig {
        direction,
        ..MergeConfig::default()
    }
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Vertical), Just(Direction::Horizontal)]
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn clusters_partition_the_input(
        boxes in proptest_helpers::arb_boxes(24),
        direction in arb_direction(),
    ) {
        let clusters = merge_regions(&boxes, &config(direction));
        let mut seen: Vec<usize> = clusters
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..boxes.len()).collect::<Vec<_>>());
    }

    #[test]
    fn no_two_output_clusters_still_qualify(
        boxes in proptest_helpers::arb_boxes(24),
        direction in arb_direction(),
    ) {
        let config = config(direction);
        let clusters = merge_regions(&boxes, &config);
        for (i, a) in clusters.iter().enumerate() {
            for b in &clusters[i + 1..] {
                let joinable = config.labels.compatible(&a.label, &b.label)
                    && is_adjacent(&a.rect, &b.rect, &config);
                prop_assert!(
                    !joinable,
                    "clusters {:?} and {:?} should have merged",
                    a.members,
                    b.members
                );
            }
        }
    }

    #[test]
    fn merging_merged_output_changes_nothing(
        boxes in proptest_helpers::arb_boxes(24),
        direction in arb_direction(),
    ) {
        let config = config(direction);
        let first: Vec<DetectionBox> = merge_regions(&boxes, &config)
            .iter()
            .map(|c| c.to_box(&boxes))
            .collect();
        let second = merge_regions(&first, &config);
        prop_assert_eq!(second.len(), first.len());
        prop_assert!(second.iter().all(|c| c.is_singleton()));
    }

    #[test]
    fn cluster_rect_encloses_every_member(
        boxes in proptest_helpers::arb_boxes(24),
        direction in arb_direction(),
    ) {
        for cluster in merge_regions(&boxes, &config(direction)) {
            for &idx in &cluster.members {
                prop_assert!(cluster.rect.contains(&boxes[idx].rect()));
            }
        }
    }
}
