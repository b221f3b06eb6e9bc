//! Merge configuration.
//!
//! Every knob of the merge engine is an explicit field here; nothing is read
//! from process-wide state. A [`MergeSettings`] file bundles one base
//! [`MergeConfig`] with the pass schedule and per-axis thresholds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::MangalabelError;

/// Axis along which fragments are stacked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Fragments stacked top to bottom (lines of a speech balloon).
    #[default]
    Vertical,
    /// Fragments side by side (pieces of a caption strip).
    Horizontal,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Vertical => "vertical",
            Direction::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which merge passes to run, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    #[default]
    Vertical,
    Horizontal,
    VerticalThenHorizontal,
    HorizontalThenVertical,
    None,
}

impl MergeMode {
    pub fn passes(&self) -> &'static [Direction] {
        match self {
            MergeMode::Vertical => &[Direction::Vertical],
            MergeMode::Horizontal => &[Direction::Horizontal],
            MergeMode::VerticalThenHorizontal => &[Direction::Vertical, Direction::Horizontal],
            MergeMode::HorizontalThenVertical => &[Direction::Horizontal, Direction::Vertical],
            MergeMode::None => &[],
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "vertical" => Ok(MergeMode::Vertical),
            "horizontal" => Ok(MergeMode::Horizontal),
            "vertical-then-horizontal" => Ok(MergeMode::VerticalThenHorizontal),
            "horizontal-then-vertical" => Ok(MergeMode::HorizontalThenVertical),
            "none" => Ok(MergeMode::None),
            other => Err(format!("unknown merge mode '{other}'")),
        }
    }
}

/// How the label of a merged region is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMergeStrategy {
    /// Label of the earliest member.
    #[default]
    First,
    /// Distinct member labels joined with the label separator.
    Combine,
    /// First label that is not a placeholder such as `"label"`.
    PreferNonDefault,
    /// Shortest label, so `balloon` wins over `balloon2`.
    PreferShorter,
}

impl FromStr for LabelMergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "first" => Ok(LabelMergeStrategy::First),
            "combine" => Ok(LabelMergeStrategy::Combine),
            "prefer-non-default" => Ok(LabelMergeStrategy::PreferNonDefault),
            "prefer-shorter" => Ok(LabelMergeStrategy::PreferShorter),
            other => Err(format!("unknown label merge strategy '{other}'")),
        }
    }
}

/// Order in which member texts are concatenated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingDirection {
    /// Vertical columns read right to left (CJK); rightmost text first.
    #[default]
    VerticalRtl,
    /// Horizontal lines read top to bottom; topmost text first.
    HorizontalTtb,
}

impl ReadingDirection {
    pub fn default_separator(&self) -> &'static str {
        match self {
            ReadingDirection::VerticalRtl => "",
            ReadingDirection::HorizontalTtb => "\n",
        }
    }
}

impl FromStr for ReadingDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "vertical-rtl" | "rtl" => Ok(ReadingDirection::VerticalRtl),
            "horizontal-ttb" | "ttb" => Ok(ReadingDirection::HorizontalTtb),
            other => Err(format!("unknown reading direction '{other}'")),
        }
    }
}

/// Which labels may be merged with which.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelPolicy {
    /// Labels that never merge with anything.
    pub exclude: BTreeSet<String>,
    /// Without merge groups, only identical labels merge.
    pub require_same_label: bool,
    /// When non-empty, two labels merge only if some group lists both.
    pub merge_groups: Vec<Vec<String>>,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            exclude: BTreeSet::new(),
            require_same_label: true,
            merge_groups: Vec::new(),
        }
    }
}

impl LabelPolicy {
    fn group_of(&self, label: &str) -> Option<usize> {
        self.merge_groups
            .iter()
            .position(|group| group.iter().any(|l| l == label))
    }

    /// The label gate, checked before any geometry.
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        if self.exclude.contains(a) || self.exclude.contains(b) {
            return false;
        }
        if !self.merge_groups.is_empty() {
            return match (self.group_of(a), self.group_of(b)) {
                (Some(ga), Some(gb)) => ga == gb,
                _ => false,
            };
        }
        !self.require_same_label || a == b
    }
}

/// Parameters for one merge pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub direction: Direction,
    /// Largest allowed gap in pixels between the facing edges.
    pub max_gap: f64,
    /// Minimum overlap across the stacking axis, in percent of the
    /// narrower box.
    pub min_overlap_ratio: f64,
    /// Added to the measured overlap before the ratio test.
    pub overlap_epsilon: f64,
    /// Overlapping boxes (negative gap) count as adjacent.
    pub allow_negative_gap: bool,
    /// A box fully inside another always merges into it.
    pub merge_contained: bool,
    /// Any touching or overlapping pair merges regardless of ratios.
    pub merge_any_overlap: bool,
    #[serde(flatten)]
    pub labels: LabelPolicy,
    pub label_strategy: LabelMergeStrategy,
    pub label_separator: String,
    /// Placeholder labels skipped by `prefer-non-default`.
    pub default_labels: BTreeSet<String>,
    /// Concatenate member texts instead of keeping the first member's.
    pub merge_text: bool,
    pub reading_direction: ReadingDirection,
    /// Overrides the reading direction's default separator.
    pub text_separator: Option<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Vertical,
            max_gap: 15.0,
            min_overlap_ratio: 50.0,
            overlap_epsilon: 1e-6,
            allow_negative_gap: true,
            merge_contained: true,
            merge_any_overlap: false,
            labels: LabelPolicy::default(),
            label_strategy: LabelMergeStrategy::First,
            label_separator: "+".to_string(),
            default_labels: ["label", ""].into_iter().map(String::from).collect(),
            merge_text: false,
            reading_direction: ReadingDirection::VerticalRtl,
            text_separator: None,
        }
    }
}

impl MergeConfig {
    pub fn text_separator(&self) -> &str {
        self.text_separator
            .as_deref()
            .unwrap_or_else(|| self.reading_direction.default_separator())
    }

    /// Checks the numeric fields once per batch.
    pub fn validate(&self) -> Result<(), MangalabelError> {
        if !self.max_gap.is_finite() {
            return Err(invalid("max_gap must be finite"));
        }
        if !(0.0..=100.0).contains(&self.min_overlap_ratio) {
            return Err(invalid(format!(
                "min_overlap_ratio must be a percentage in [0, 100], got {}",
                self.min_overlap_ratio
            )));
        }
        if !self.overlap_epsilon.is_finite() || self.overlap_epsilon < 0.0 {
            return Err(invalid("overlap_epsilon must be finite and non-negative"));
        }
        for (idx, group) in self.labels.merge_groups.iter().enumerate() {
            if group.is_empty() {
                return Err(invalid(format!("merge group {idx} is empty")));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> MangalabelError {
    MangalabelError::InvalidMergeConfig {
        message: message.into(),
    }
}

/// Thresholds for one axis, overriding the base config for that pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisThresholds {
    pub max_gap: f64,
    pub min_overlap_ratio: f64,
}

/// Contents of a merge configuration file.
///
/// ```yaml
/// mode: vertical-then-horizontal
/// vertical: { max_gap: 15, min_overlap_ratio: 50 }
/// horizontal: { max_gap: 10, min_overlap_ratio: 10 }
/// exclude: [other]
/// label_strategy: prefer-shorter
/// merge_text: true
/// reading_direction: vertical-rtl
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub mode: MergeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<AxisThresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<AxisThresholds>,
    #[serde(flatten)]
    pub base: MergeConfig,
}

impl MergeSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self, MangalabelError> {
        let data = fs::read_to_string(path).map_err(MangalabelError::Io)?;
        Self::from_yaml_str(&data).map_err(|source| MangalabelError::MergeConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config for one pass: the base with the pass direction and that
    /// axis's thresholds applied.
    pub fn config_for(&self, direction: Direction) -> MergeConfig {
        let mut config = self.base.clone();
        config.direction = direction;
        let axis = match direction {
            Direction::Vertical => self.vertical,
            Direction::Horizontal => self.horizontal,
        };
        if let Some(axis) = axis {
            config.max_gap = axis.max_gap;
            config.min_overlap_ratio = axis.min_overlap_ratio;
        }
        config
    }

    pub fn validate(&self) -> Result<(), MangalabelError> {
        for direction in self.mode.passes() {
            self.config_for(*direction).validate()?;
        }
        self.base.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_beats_everything() {
        let policy = LabelPolicy {
            exclude: ["other".to_string()].into(),
            require_same_label: false,
            merge_groups: vec![],
        };
        assert!(!policy.compatible("other", "other"));
        assert!(!policy.compatible("balloon", "other"));
        assert!(policy.compatible("balloon", "caption"));
    }

    #[test]
    fn groups_replace_same_label_rule() {
        let policy = LabelPolicy {
            exclude: BTreeSet::new(),
            require_same_label: true,
            merge_groups: vec![
                vec!["balloon".into(), "balloon2".into()],
                vec!["changfangtiao".into(), "changfangtiao2".into()],
            ],
        };
        assert!(policy.compatible("balloon", "balloon2"));
        assert!(!policy.compatible("balloon", "changfangtiao"));
        assert!(!policy.compatible("caption", "caption"));
    }

    #[test]
    fn same_label_rule_is_the_default() {
        let policy = LabelPolicy::default();
        assert!(policy.compatible("a", "a"));
        assert!(!policy.compatible("a", "b"));
    }

    #[test]
    fn settings_parse_from_yaml() {
        let yaml = r#"
mode: vertical-then-horizontal
vertical: { max_gap: 15, min_overlap_ratio: 50 }
horizontal: { max_gap: 10, min_overlap_ratio: 10 }
exclude: [other]
label_strategy: prefer-shorter
merge_text: true
reading_direction: horizontal-ttb
"#;
        let settings = MergeSettings::from_yaml_str(yaml).expect("parse settings");
        assert_eq!(settings.mode, MergeMode::VerticalThenHorizontal);
        assert!(settings.base.labels.exclude.contains("other"));
        assert!(settings.base.labels.require_same_label);
        assert_eq!(settings.base.label_strategy, LabelMergeStrategy::PreferShorter);
        assert_eq!(settings.base.text_separator(), "\n");

        let horizontal = settings.config_for(Direction::Horizontal);
        assert_eq!(horizontal.direction, Direction::Horizontal);
        assert_eq!(horizontal.max_gap, 10.0);
        assert_eq!(horizontal.min_overlap_ratio, 10.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let config = MergeConfig {
            min_overlap_ratio: 150.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MangalabelError::InvalidMergeConfig { .. })
        ));
    }

    #[test]
    fn mode_parsing_accepts_snake_and_kebab_case() {
        assert_eq!(
            "VERTICAL_THEN_HORIZONTAL".parse::<MergeMode>(),
            Ok(MergeMode::VerticalThenHorizontal)
        );
        assert_eq!("none".parse::<MergeMode>(), Ok(MergeMode::None));
        assert!("diagonal".parse::<MergeMode>().is_err());
    }
}
