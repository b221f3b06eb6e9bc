//! Label side of rotation and mirror augmentation.
//!
//! A run expands every image into a set of variants (one mirror mode,
//! optionally followed by one rotation) and rewrites the image's labels
//! for each. Pixels are not rendered here; the matrices and canvas sizes
//! produced for a variant are exactly the ones an image renderer must
//! use for the labels to stay in sync.

mod batch;
mod labels;
mod report;

pub use batch::{transform_dataset, variant_image_name};
pub use labels::{transform_anylabeling, transform_yolo_rows, LabelOutcome};
pub use report::TransformReport;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::MangalabelError;
use crate::transform::{
    build_mirror_matrix, build_rotation_matrix, compose, normalize_user_angle, AffineTransform,
    MirrorMode,
};

/// Angles skipped unless asked for: the original orientation and the
/// quarter turns.
pub const DEFAULT_EXCLUDED_ANGLES: [u32; 4] = [0, 90, 180, 270];

/// Parses an angle spec such as `1-359`, `350-10` or `0, 15, 30-45`.
///
/// Values are clockwise degrees folded into `[0, 360)`. A range whose start
/// is past its end wraps through zero. The result is sorted and
/// de-duplicated.
pub fn parse_angle_spec(spec: &str) -> Result<Vec<u32>, MangalabelError> {
    let invalid = |message: String| MangalabelError::InvalidAngleSpec {
        spec: spec.to_string(),
        message,
    };

    let mut angles = BTreeSet::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.split_once('-') {
            Some((start, end)) => {
                let bad_range = || invalid(format!("bad range '{token}'"));
                let start = parse_angle(start).ok_or_else(bad_range)?;
                let end = parse_angle(end).ok_or_else(bad_range)?;
                if start <= end {
                    angles.extend(start..=end);
                } else {
                    angles.extend(start..360);
                    angles.extend(0..=end);
                }
            }
            None => {
                let angle =
                    parse_angle(token).ok_or_else(|| invalid(format!("bad angle '{token}'")))?;
                angles.insert(angle);
            }
        }
    }
    Ok(angles.into_iter().collect())
}

fn parse_angle(raw: &str) -> Option<u32> {
    let value = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    // Truncates toward zero before folding, so "12.7" is 12.
    Some((value.trunc() as i64).rem_euclid(360) as u32)
}

/// Angles from `base` that are not excluded, sorted.
pub fn build_angle_list(base: &[u32], excluded: &[u32]) -> Vec<u32> {
    let excluded: BTreeSet<u32> = excluded.iter().map(|a| a % 360).collect();
    let kept: BTreeSet<u32> = base
        .iter()
        .map(|a| a % 360)
        .filter(|a| !excluded.contains(a))
        .collect();
    kept.into_iter().collect()
}

/// De-duplicates mirror modes keeping first occurrence; empty means
/// `none`.
pub fn dedup_mirror_modes(modes: &[MirrorMode]) -> Vec<MirrorMode> {
    let mut out: Vec<MirrorMode> = Vec::with_capacity(modes.len());
    for mode in modes {
        if !out.contains(mode) {
            out.push(*mode);
        }
    }
    if out.is_empty() {
        out.push(MirrorMode::None);
    }
    out
}

/// How the canvas is treated when rotating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderMode {
    /// Grow the canvas so nothing is cropped.
    #[default]
    Expand,
    /// Keep the size; uncovered pixels get a fill color.
    Constant,
    /// Keep the size; uncovered pixels repeat the edge.
    Replicate,
}

impl BorderMode {
    pub fn name(&self) -> &'static str {
        match self {
            BorderMode::Expand => "expand",
            BorderMode::Constant => "constant",
            BorderMode::Replicate => "replicate",
        }
    }

    pub fn expands(&self) -> bool {
        matches!(self, BorderMode::Expand)
    }
}

impl fmt::Display for BorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BorderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expand" => Ok(BorderMode::Expand),
            "constant" => Ok(BorderMode::Constant),
            "replicate" => Ok(BorderMode::Replicate),
            other => Err(format!(
                "unknown border mode '{other}' (expected expand, constant, replicate)"
            )),
        }
    }
}

/// One output of an augmentation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variant {
    pub mirror: MirrorMode,
    /// Clockwise degrees in `[0, 360)`; `None` when rotation is off.
    pub angle: Option<u32>,
}

/// Matrix and output canvas of a variant on a concrete image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariantGeometry {
    pub matrix: AffineTransform,
    pub width: u32,
    pub height: u32,
}

impl Variant {
    fn mirror_tag(&self) -> &'static str {
        match self.mirror {
            MirrorMode::None => "",
            MirrorMode::Horizontal => "JXH",
            MirrorMode::Vertical => "JXV",
            MirrorMode::Both => "JXHV",
            MirrorMode::UpsideDown => "DZ",
        }
    }

    /// Name suffix: mirror tag and `{angle}du`, joined with `_`. A zero
    /// angle adds nothing.
    pub fn prefix(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(2);
        if !self.mirror_tag().is_empty() {
            parts.push(self.mirror_tag().to_string());
        }
        if let Some(angle) = self.angle.map(|a| a % 360).filter(|a| *a != 0) {
            parts.push(format!("{angle}du"));
        }
        parts.join("_")
    }

    /// `{stem}_{prefix}`, or the bare stem when the prefix is empty.
    pub fn output_stem(&self, stem: &str) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}_{prefix}")
        }
    }

    /// Mirror first, then rotate about the (unchanged) mirrored canvas.
    pub fn geometry(&self, width: u32, height: u32, border: BorderMode) -> VariantGeometry {
        let mirror = build_mirror_matrix(self.mirror, width, height);
        let Some(angle) = self.angle else {
            return VariantGeometry {
                matrix: mirror,
                width,
                height,
            };
        };
        let rotation = build_rotation_matrix(
            normalize_user_angle(f64::from(angle)),
            width,
            height,
            border.expands(),
        );
        VariantGeometry {
            matrix: compose(&rotation.matrix, &mirror),
            width: rotation.width,
            height: rotation.height,
        }
    }
}

/// Settings of one augmentation run.
#[derive(Clone, Debug, PartialEq)]
pub struct AugmentOptions {
    /// Candidate angles after exclusions; `None` disables rotation.
    pub angles: Option<Vec<u32>>,
    /// Pick this many distinct angles per image and mirror mode.
    pub random: Option<usize>,
    pub seed: Option<u64>,
    pub mirrors: Vec<MirrorMode>,
    pub border: BorderMode,
    /// Rotate axis-aligned label files by arbitrary angles, accepting
    /// enlarged enclosing boxes.
    pub allow_hbb_rotation: bool,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            angles: None,
            random: None,
            seed: None,
            mirrors: vec![MirrorMode::None],
            border: BorderMode::Expand,
            allow_hbb_rotation: false,
        }
    }
}

/// Produces the variant list for each image in turn.
pub struct VariantPlanner {
    angles: Option<Vec<u32>>,
    random: Option<usize>,
    mirrors: Vec<MirrorMode>,
    rng: StdRng,
}

impl VariantPlanner {
    pub fn new(options: &AugmentOptions) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        Self {
            angles: options.angles.clone(),
            random: options.random,
            mirrors: dedup_mirror_modes(&options.mirrors),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Variants for the next image. Random sampling draws anew for every
    /// image and mirror mode.
    pub fn next_image(&mut self) -> Vec<Variant> {
        let mut variants = Vec::new();
        for &mirror in &self.mirrors {
            let Some(angles) = &self.angles else {
                variants.push(Variant {
                    mirror,
                    angle: None,
                });
                continue;
            };

            let mut chosen = angles.clone();
            if let Some(count) = self.random {
                if count < chosen.len() {
                    chosen.shuffle(&mut self.rng);
                    chosen.truncate(count.max(1));
                    chosen.sort_unstable();
                }
            }
            variants.extend(chosen.into_iter().map(|angle| Variant {
                mirror,
                angle: Some(angle),
            }));
        }
        variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_spec_ranges_lists_and_wraps() {
        assert_eq!(parse_angle_spec("0, 30,45,60").expect("list"), vec![0, 30, 45, 60]);
        assert_eq!(parse_angle_spec("10-20, 90, 120-125").expect("ranges").len(), 11 + 1 + 6);
        assert_eq!(
            parse_angle_spec("358-2").expect("wrap"),
            vec![0, 1, 2, 358, 359]
        );
        assert_eq!(parse_angle_spec("1-359").expect("full").len(), 359);
        assert_eq!(parse_angle_spec("370, 720").expect("fold"), vec![0, 10]);
        assert!(parse_angle_spec(" , ").expect("empty").is_empty());
    }

    #[test]
    fn angle_spec_rejects_garbage() {
        for spec in ["abc", "10-x", "5,,nope"] {
            assert!(matches!(
                parse_angle_spec(spec),
                Err(MangalabelError::InvalidAngleSpec { .. })
            ));
        }
    }

    #[test]
    fn exclusions_are_removed() {
        let base = parse_angle_spec("0-10, 85-95").expect("spec");
        let angles = build_angle_list(&base, &DEFAULT_EXCLUDED_ANGLES);
        assert!(!angles.contains(&0));
        assert!(!angles.contains(&90));
        assert_eq!(angles.len(), 10 + 10);
    }

    #[test]
    fn mirror_lists_dedup_in_order() {
        use MirrorMode::*;
        assert_eq!(
            dedup_mirror_modes(&[Vertical, Horizontal, Vertical]),
            vec![Vertical, Horizontal]
        );
        assert_eq!(dedup_mirror_modes(&[]), vec![None]);
    }

    #[test]
    fn variant_names() {
        let cases = [
            (MirrorMode::None, None, ""),
            (MirrorMode::None, Some(0), ""),
            (MirrorMode::None, Some(15), "15du"),
            (MirrorMode::Horizontal, None, "JXH"),
            (MirrorMode::Both, Some(350), "JXHV_350du"),
            (MirrorMode::UpsideDown, Some(0), "DZ"),
            (MirrorMode::Vertical, Some(90), "JXV_90du"),
        ];
        for (mirror, angle, expected) in cases {
            assert_eq!(Variant { mirror, angle }.prefix(), expected);
        }
        let v = Variant {
            mirror: MirrorMode::Horizontal,
            angle: Some(30),
        };
        assert_eq!(v.output_stem("page_01"), "page_01_JXH_30du");
    }

    #[test]
    fn geometry_mirrors_before_rotating() {
        let v = Variant {
            mirror: MirrorMode::Horizontal,
            angle: Some(90),
        };
        let g = v.geometry(100, 50, BorderMode::Expand);
        assert_eq!((g.width, g.height), (50, 100));

        // (0, 0) mirrors to (99, 0), then a clockwise quarter turn of the
        // 100x50 canvas into 50x100 sends (x, y) to (50 - y, x).
        let p = g.matrix.apply(&[0.0, 0.0].into());
        assert!((p.x - 50.0).abs() < 1e-9, "{p:?}");
        assert!((p.y - 99.0).abs() < 1e-9, "{p:?}");

        let same = v.geometry(100, 50, BorderMode::Replicate);
        assert_eq!((same.width, same.height), (100, 50));
    }

    #[test]
    fn planner_without_rotation_yields_one_variant_per_mirror() {
        let options = AugmentOptions {
            mirrors: vec![MirrorMode::Horizontal, MirrorMode::Vertical],
            ..Default::default()
        };
        let variants = VariantPlanner::new(&options).next_image();
        assert_eq!(
            variants,
            vec![
                Variant {
                    mirror: MirrorMode::Horizontal,
                    angle: None
                },
                Variant {
                    mirror: MirrorMode::Vertical,
                    angle: None
                },
            ]
        );
    }

    #[test]
    fn random_sampling_is_seeded_and_bounded() {
        let options = AugmentOptions {
            angles: Some(build_angle_list(
                &parse_angle_spec("1-359").expect("spec"),
                &DEFAULT_EXCLUDED_ANGLES,
            )),
            random: Some(3),
            seed: Some(7),
            ..Default::default()
        };
        let mut a = VariantPlanner::new(&options);
        let mut b = VariantPlanner::new(&options);
        for _ in 0..4 {
            let va = a.next_image();
            assert_eq!(va.len(), 3);
            assert_eq!(va, b.next_image());
            let mut angles: Vec<u32> = va.iter().filter_map(|v| v.angle).collect();
            angles.dedup();
            assert_eq!(angles.len(), 3);
            assert!(angles.iter().all(|a| *a % 90 != 0));
        }

        let everything = AugmentOptions {
            angles: Some(vec![10, 20]),
            random: Some(5),
            ..Default::default()
        };
        assert_eq!(VariantPlanner::new(&everything).next_image().len(), 2);
    }
}
