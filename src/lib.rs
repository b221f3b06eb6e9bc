//! Mangalabel: label geometry tools for manga and comic datasets.
//!
//! Two engines sit behind a small command-line front end:
//!
//! - [`transform`]: affine matrices for rotation (with canvas expansion)
//!   and mirroring, point mapping, and refitting transformed polygons to
//!   axis-aligned or minimum-area oriented boxes.
//! - [`merge`]: direction-aware clustering of fragmented text-region
//!   detections into logical blocks, with label and text merge policies.
//!
//! [`augment`] drives the transform engine over label files for dataset
//! augmentation; [`ir`] holds the typed geometry and the file formats.

pub mod augment;
pub mod error;
pub mod ir;
pub mod merge;
pub mod transform;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

pub use error::MangalabelError;

use augment::{AugmentOptions, BorderMode, DEFAULT_EXCLUDED_ANGLES};
use ir::io_anylabeling::{read_anylabeling_json, write_anylabeling_json};
use ir::io_yolo::{collect_files_with_extensions, rel_string};
use merge::{LabelMergeStrategy, MergeMode, MergeSettings, ReadingDirection};
use transform::MirrorMode;

/// The mangalabel CLI application.
#[derive(Parser)]
#[command(name = "mangalabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Rotate and mirror label files to match augmented images.
    Transform(TransformArgs),
    /// Merge fragmented text regions in X-AnyLabeling JSON files.
    Merge(MergeArgs),
}

/// Arguments for the transform subcommand.
#[derive(clap::Args)]
struct TransformArgs {
    /// Folder of images with `.txt` (YOLO) or `.json` (X-AnyLabeling) labels.
    input: PathBuf,

    /// Output folder for the transformed label files.
    #[arg(short, long)]
    output: PathBuf,

    /// Clockwise angles to generate, e.g. '1-359', '350-10', '15,30,45'.
    /// Without it no rotation is applied.
    #[arg(long)]
    angles: Option<String>,

    /// Angles to leave out of --angles [default: 0,90,180,270].
    /// Pass an empty string to keep every angle.
    #[arg(long)]
    exclude: Option<String>,

    /// Pick this many random angles per image instead of all of them.
    #[arg(long)]
    random: Option<usize>,

    /// Seed for --random.
    #[arg(long)]
    seed: Option<u64>,

    /// Mirror modes, comma separated (none, hflip, vflip, hvflip, upsidedown).
    #[arg(long, value_delimiter = ',', default_value = "none")]
    flip: Vec<MirrorMode>,

    /// Canvas policy for rotation (expand, constant, replicate).
    #[arg(long, default_value = "expand")]
    border: BorderMode,

    /// Also rotate axis-aligned YOLO boxes by non-right angles; the boxes
    /// become enclosing boxes of the rotated originals.
    #[arg(long)]
    allow_hbb_rotation: bool,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// JSON files or folders to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// YAML merge configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pass schedule (vertical, horizontal, vertical-then-horizontal,
    /// horizontal-then-vertical, none).
    #[arg(long)]
    mode: Option<MergeMode>,

    /// Largest gap in pixels between merged boxes, for every pass.
    #[arg(long)]
    max_gap: Option<f64>,

    /// Minimum overlap in percent of the narrower box, for every pass.
    #[arg(long)]
    min_overlap: Option<f64>,

    /// Label strategy (first, combine, prefer-non-default, prefer-shorter).
    #[arg(long)]
    label_strategy: Option<LabelMergeStrategy>,

    /// Concatenate the descriptions of merged shapes.
    #[arg(long)]
    merge_text: bool,

    /// Order of merged text (vertical-rtl, horizontal-ttb).
    #[arg(long)]
    reading_direction: Option<ReadingDirection>,

    /// Write results here instead of overwriting the inputs.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report what would change without writing files.
    #[arg(long)]
    dry_run: bool,
}

/// Run the mangalabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), MangalabelError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Some(Commands::Transform(args)) => run_transform(args),
        Some(Commands::Merge(args)) => run_merge(args),
        None => {
            println!("mangalabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Label geometry tools for manga and comic datasets.");
            println!();
            println!("Run 'mangalabel --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the transform subcommand.
fn run_transform(args: TransformArgs) -> Result<(), MangalabelError> {
    let angles = match &args.angles {
        Some(spec) => {
            let excluded = match args.exclude.as_deref() {
                None => DEFAULT_EXCLUDED_ANGLES.to_vec(),
                Some(list) if list.trim().is_empty() => Vec::new(),
                Some(list) => augment::parse_angle_spec(list)?,
            };
            let angles = augment::build_angle_list(&augment::parse_angle_spec(spec)?, &excluded);
            if angles.is_empty() {
                return Err(MangalabelError::InvalidAngleSpec {
                    spec: spec.clone(),
                    message: format!("no angles left after excluding {:?}", excluded),
                });
            }
            Some(angles)
        }
        None => None,
    };

    let options = AugmentOptions {
        angles,
        random: args.random,
        seed: args.seed,
        mirrors: augment::dedup_mirror_modes(&args.flip),
        border: args.border,
        allow_hbb_rotation: args.allow_hbb_rotation,
    };
    tracing::info!(?options, "transform options");

    let report = augment::transform_dataset(&args.input, &args.output, &options)?;
    print!("{}", report);
    Ok(())
}

fn merge_settings(args: &MergeArgs) -> Result<MergeSettings, MangalabelError> {
    let mut settings = match &args.config {
        Some(path) => MergeSettings::load(path)?,
        None => MergeSettings::default(),
    };

    if let Some(mode) = args.mode {
        settings.mode = mode;
    }
    if let Some(max_gap) = args.max_gap {
        settings.base.max_gap = max_gap;
        for axis in [&mut settings.vertical, &mut settings.horizontal]
            .into_iter()
            .flatten()
        {
            axis.max_gap = max_gap;
        }
    }
    if let Some(ratio) = args.min_overlap {
        settings.base.min_overlap_ratio = ratio;
        for axis in [&mut settings.vertical, &mut settings.horizontal]
            .into_iter()
            .flatten()
        {
            axis.min_overlap_ratio = ratio;
        }
    }
    if let Some(strategy) = args.label_strategy {
        settings.base.label_strategy = strategy;
    }
    if args.merge_text {
        settings.base.merge_text = true;
    }
    if let Some(direction) = args.reading_direction {
        settings.base.reading_direction = direction;
    }

    settings.validate()?;
    Ok(settings)
}

/// JSON files named by `inputs`, each with the root its output path is
/// relative to.
fn collect_json_inputs(inputs: &[PathBuf]) -> Result<Vec<(PathBuf, PathBuf)>, MangalabelError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for file in collect_files_with_extensions(input, &["json"])? {
                files.push((input.clone(), file));
            }
        } else if input.is_file() {
            let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
            files.push((root, input.clone()));
        } else {
            return Err(MangalabelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input not found: {}", input.display()),
            )));
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    files.dedup_by(|a, b| a.1 == b.1);
    Ok(files)
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), MangalabelError> {
    let settings = merge_settings(&args)?;
    let files = collect_json_inputs(&args.inputs)?;
    if files.is_empty() {
        println!("No JSON files found.");
        return Ok(());
    }

    let mut changed = 0usize;
    for (root, path) in &files {
        let mut file = match read_anylabeling_json(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("skipping {err}");
                continue;
            }
        };
        if file.shapes.is_empty() {
            tracing::info!(path = %path.display(), "no shapes");
            continue;
        }

        let report = file.merge_shapes(&settings);
        println!("{}: {}", path.display(), report);
        if report.changed() {
            changed += 1;
        }

        if args.dry_run {
            continue;
        }
        let target = match &args.output {
            Some(dir) => dir.join(rel_string(root, path)),
            None => path.clone(),
        };
        write_anylabeling_json(&target, &file)?;
    }

    println!(
        "Merged regions in {} of {} file(s){}",
        changed,
        files.len(),
        if args.dry_run { " (dry run)" } else { "" }
    );
    Ok(())
}
