use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use floorplan::{
    dataset::{room_table_text, survey_room_types},
    sample::{DEFAULT_IMAGE_NAME, DEFAULT_SVG_NAME},
    Converter, GridShape, OutputMode, RoomTable, SampleLayout, Shapes, SplitReport,
};

/// How converted arrays are laid out on disk.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// One `<split>_inputs.npy` / `<split>_labels.npy` pair per split.
    Condensed,
    /// One `input.npy` / `label.npy` pair per sample folder under `<split>/`.
    Separate,
}

impl From<Mode> for OutputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Condensed => OutputMode::Condensed,
            Mode::Separate => OutputMode::Separate,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Condensed => "condensed",
            Mode::Separate => "separate",
        };

        f.write_str(s)
    }
}

#[derive(Parser, Debug)]
#[command(name = "floorplan2npy", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert split manifests into image / label arrays.
    Convert(ConvertArgs),
    /// Collect every room type in the dataset into a room table.
    RoomTypes(RoomTypesArgs),
}

#[derive(Args, Debug, Clone)]
struct ConvertArgs {
    /// Dataset root; manifests and sample folders are resolved against it.
    #[arg(long, env = "FLOORPLAN_DATASET_DIR", default_value = "./data/cubicasa5k")]
    dataset_dir: PathBuf,

    /// `label: id` table; labels may be comma-joined alias lists.
    #[arg(long, env = "FLOORPLAN_ROOM_TABLE", default_value = "room_types_succinct.txt")]
    room_table: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Condensed)]
    mode: Mode,

    /// Split manifest file names inside the dataset root.
    #[arg(long, value_delimiter = ',', default_value = "train.txt,val.txt,test.txt")]
    splits: Vec<String>,

    /// Resized image height fed to the model.
    #[arg(long, default_value_t = 256)]
    input_height: usize,

    #[arg(long, default_value_t = 256)]
    input_width: usize,

    /// Label grid height.
    #[arg(long, default_value_t = 256)]
    output_height: usize,

    #[arg(long, default_value_t = 256)]
    output_width: usize,

    #[arg(long, default_value = DEFAULT_IMAGE_NAME)]
    image_name: String,

    #[arg(long, default_value = DEFAULT_SVG_NAME)]
    svg_name: String,

    /// Also write a colour overlay PNG per sample.
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Write a JSON summary (per-split counts, unmatched room types, class legend).
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct RoomTypesArgs {
    #[arg(long, env = "FLOORPLAN_DATASET_DIR", default_value = "./data/cubicasa5k")]
    dataset_dir: PathBuf,

    /// Category directories below the dataset root that hold sample folders.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "colorful,high_quality,high_quality_architectural"
    )]
    categories: Vec<String>,

    #[arg(long, default_value = DEFAULT_SVG_NAME)]
    svg_name: String,

    #[arg(long, default_value = "room_types.txt")]
    output: PathBuf,
}

#[derive(Debug, serde::Serialize)]
struct SplitSummary {
    split: String,
    samples: usize,
    rooms: usize,
    matched: usize,
    unmatched: BTreeMap<String, usize>,
}

impl From<SplitReport> for SplitSummary {
    fn from(r: SplitReport) -> Self {
        Self {
            split: r.split,
            samples: r.samples,
            rooms: r.rooms,
            matched: r.matched,
            unmatched: r.unmatched,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct RunReport {
    mode: String,
    input_shape: [usize; 3],
    output_shape: [usize; 2],
    /// class id -> label field of the room table
    classes: BTreeMap<u8, String>,
    splits: Vec<SplitSummary>,
}

fn convert(args: &ConvertArgs) -> Result<()> {
    let table = RoomTable::load(&args.room_table)
        .with_context(|| format!("loading room table {}", args.room_table.display()))?;
    if table.is_empty() {
        bail!("room table {} has no entries", args.room_table.display());
    }
    info!(
        "Room table: {} entries, max class {}",
        table.len(),
        table.max_class()
    );

    let shapes = Shapes {
        input: GridShape::new(args.input_height, args.input_width),
        output: GridShape::new(args.output_height, args.output_width),
    };

    let converter = Converter::new(&args.dataset_dir, &table, shapes)
        .with_layout(SampleLayout {
            image_name: args.image_name.clone(),
            svg_name: args.svg_name.clone(),
        })
        .with_preview(args.preview);

    let mut summaries = Vec::with_capacity(args.splits.len());

    for split in &args.splits {
        let manifest = args.dataset_dir.join(split);
        let started = Instant::now();
        info!("Converting {} ({} mode)", manifest.display(), args.mode);

        let report = converter
            .convert_split(&manifest, args.mode.into())
            .with_context(|| format!("converting split {}", manifest.display()))?;

        if !report.unmatched.is_empty() {
            warn!(
                "{}: {} room types not in the room table",
                report.split,
                report.unmatched.len()
            );
        }
        info!(
            "{}: done in {:.1}s",
            report.split,
            started.elapsed().as_secs_f64()
        );

        summaries.push(SplitSummary::from(report));
    }

    if let Some(path) = &args.report {
        let report = RunReport {
            mode: args.mode.to_string(),
            input_shape: [shapes.input.height, shapes.input.width, 3],
            output_shape: [shapes.output.height, shapes.output.width],
            classes: table
                .entries()
                .iter()
                .map(|e| (e.class_id, e.label.clone()))
                .collect(),
            splits: summaries,
        };
        write_json(path, &report)?;
        info!("Wrote report {}", path.display());
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn room_types(args: &RoomTypesArgs) -> Result<()> {
    let types = survey_room_types(&args.dataset_dir, &args.categories, &args.svg_name)
        .with_context(|| format!("surveying {}", args.dataset_dir.display()))?;

    if types.len() > u8::MAX as usize {
        warn!(
            "{} room types exceed the 255 label classes; condense the table before converting",
            types.len()
        );
    }

    fs::write(&args.output, room_table_text(&types))
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("Wrote {} room types to {}", types.len(), args.output.display());

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Convert(args) => convert(args),
        Command::RoomTypes(args) => room_types(args),
    }
}
