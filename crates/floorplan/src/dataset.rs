//! Dataset-level driving: split manifests, output layouts and the room-type
//! survey.
//!
//! Samples are converted strictly in manifest order, one at a time. The
//! first failing sample aborts the split.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::{ArrayBase, Data, Dimension};
use npy::{Element, NpyWriter};
use walkdir::WalkDir;

use crate::error::{io_err, FloorplanError, Result};
use crate::preview::{write_preview, Palette};
use crate::rooms::RoomTable;
use crate::sample::{FloorplanSample, SampleLayout, Shapes};
use crate::svg;

pub const INPUT_FILE: &str = "input.npy";
pub const LABEL_FILE: &str = "label.npy";
pub const PREVIEW_FILE: &str = "preview.png";

/// How converted arrays are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `<dataset>/<split>_inputs.npy` and `<dataset>/<split>_labels.npy`.
    Condensed,
    /// `<dataset>/<split>/<sample>/input.npy` and `label.npy`.
    Separate,
}

/// Sample folder references from a split manifest, in file order.
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(io_err(path))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Manifest entries are written as `/category/id/`; treat them as relative.
pub fn sample_folder(root: &Path, entry: &str) -> PathBuf {
    root.join(entry.trim_start_matches('/'))
}

/// `train.txt` -> `train`.
pub fn split_name(manifest: &Path) -> String {
    manifest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_owned())
}

#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    pub split: String,
    pub samples: usize,
    pub rooms: usize,
    pub matched: usize,
    /// Unmatched room type -> number of rooms skipped.
    pub unmatched: BTreeMap<String, usize>,
}

impl SplitReport {
    fn record(&mut self, sample: &FloorplanSample) {
        self.samples += 1;
        self.rooms += sample.stats.rooms;
        self.matched += sample.stats.matched;
        for room_type in &sample.stats.unmatched {
            *self.unmatched.entry(room_type.clone()).or_default() += 1;
        }
    }
}

/// Row-major elements of `array`, copied only if it is not already contiguous.
fn contiguous<T, S, D>(array: &ArrayBase<S, D>) -> Cow<'_, [T]>
where
    T: Element,
    S: Data<Elem = T>,
    D: Dimension,
{
    match array.as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(array.iter().copied().collect()),
    }
}

/// Converts the samples of a dataset directory.
pub struct Converter<'a> {
    pub dataset_dir: PathBuf,
    pub table: &'a RoomTable,
    pub shapes: Shapes,
    pub layout: SampleLayout,
    pub preview: Option<Palette>,
}

impl<'a> Converter<'a> {
    pub fn new(dataset_dir: impl Into<PathBuf>, table: &'a RoomTable, shapes: Shapes) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            table,
            shapes,
            layout: SampleLayout::default(),
            preview: None,
        }
    }

    pub fn with_layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.preview = enabled.then(|| Palette::hsv(self.table.max_class()));
        self
    }

    /// Convert one sample folder reference.
    pub fn load_sample(&self, entry: &str) -> Result<FloorplanSample> {
        let folder = sample_folder(&self.dataset_dir, entry);
        FloorplanSample::load(&folder, &self.layout, self.table, &self.shapes).map_err(|source| {
            FloorplanError::Sample {
                folder,
                source: Box::new(source),
            }
        })
    }

    fn maybe_preview(&self, dir: &Path, sample: &FloorplanSample) -> Result<()> {
        if let Some(palette) = &self.preview {
            fs::create_dir_all(dir).map_err(io_err(dir))?;
            write_preview(&dir.join(PREVIEW_FILE), sample, palette)?;
        }
        Ok(())
    }

    pub fn convert_split(&self, manifest: &Path, mode: OutputMode) -> Result<SplitReport> {
        let entries = read_manifest(manifest)?;
        let split = split_name(manifest);

        if entries.is_empty() {
            warn!("{}: manifest lists no samples", manifest.display());
        }

        let report = match mode {
            OutputMode::Condensed => self.write_condensed(manifest, &split, &entries)?,
            OutputMode::Separate => self.write_separate(manifest, &split, &entries)?,
        };

        info!(
            "{}: {} samples, {}/{} rooms labelled",
            split, report.samples, report.matched, report.rooms
        );
        for (room_type, count) in &report.unmatched {
            debug!("{}: room type {:?} unmatched {} times", split, room_type, count);
        }

        Ok(report)
    }

    fn write_condensed(&self, manifest: &Path, split: &str, entries: &[String]) -> Result<SplitReport> {
        let Shapes { input, output } = self.shapes;
        let inputs_path = self.dataset_dir.join(format!("{split}_inputs.npy"));
        let labels_path = self.dataset_dir.join(format!("{split}_labels.npy"));

        let mut inputs = NpyWriter::<_, f32>::create(
            &inputs_path,
            &[entries.len(), input.height, input.width, 3],
        )
        .map_err(io_err(&inputs_path))?;
        let mut labels = NpyWriter::<_, u8>::create(
            &labels_path,
            &[entries.len(), output.height, output.width],
        )
        .map_err(io_err(&labels_path))?;

        let mut report = SplitReport {
            split: split.to_owned(),
            ..Default::default()
        };

        for (line, entry) in entries.iter().enumerate() {
            info!("process {} line: {}", manifest.display(), line + 1);
            let sample = self.load_sample(entry)?;

            inputs
                .write_item(&contiguous(&sample.image))
                .map_err(io_err(&inputs_path))?;
            labels
                .write_item(&contiguous(sample.labels.as_array()))
                .map_err(io_err(&labels_path))?;
            self.maybe_preview(&sample_folder(&self.dataset_dir.join(split), entry), &sample)?;

            report.record(&sample);
        }

        inputs.finish().map_err(io_err(&inputs_path))?;
        labels.finish().map_err(io_err(&labels_path))?;
        info!("wrote {} and {}", inputs_path.display(), labels_path.display());

        Ok(report)
    }

    fn write_separate(&self, manifest: &Path, split: &str, entries: &[String]) -> Result<SplitReport> {
        let split_dir = self.dataset_dir.join(split);
        let mut report = SplitReport {
            split: split.to_owned(),
            ..Default::default()
        };

        for (line, entry) in entries.iter().enumerate() {
            info!("process {} line: {}", manifest.display(), line + 1);
            let sample = self.load_sample(entry)?;

            let out_dir = sample_folder(&split_dir, entry);
            fs::create_dir_all(&out_dir).map_err(io_err(&out_dir))?;

            let input_path = out_dir.join(INPUT_FILE);
            npy::write_file(&input_path, sample.image.shape(), &contiguous(&sample.image))
                .map_err(io_err(&input_path))?;

            let label_path = out_dir.join(LABEL_FILE);
            let labels = sample.labels.as_array();
            npy::write_file(&label_path, labels.shape(), &contiguous(labels))
                .map_err(io_err(&label_path))?;

            self.maybe_preview(&out_dir, &sample)?;
            debug!("wrote {}", out_dir.display());

            report.record(&sample);
        }

        Ok(report)
    }
}

/// Distinct room types across every sample folder directly below each
/// category directory, sorted.
pub fn survey_room_types(dataset_dir: &Path, categories: &[String], svg_name: &str) -> Result<BTreeSet<String>> {
    let mut types = BTreeSet::new();

    for category in categories {
        let category_dir = dataset_dir.join(category);
        let mut folders = 0usize;

        for entry in WalkDir::new(&category_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| category_dir.clone());
                io_err(path)(e.into())
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let svg_path = entry.path().join(svg_name);
            let text = fs::read_to_string(&svg_path).map_err(io_err(&svg_path))?;
            let doc = roxmltree::Document::parse(&text).map_err(|source| FloorplanError::Sample {
                folder: entry.path().to_path_buf(),
                source: Box::new(source.into()),
            })?;

            types.extend(svg::room_types(&doc).into_iter().map(str::to_owned));
            folders += 1;
        }

        info!("{}: scanned {} sample folders", category_dir.display(), folders);
    }

    Ok(types)
}

/// Render surveyed types as a `type: id` table with ids counting from 1.
pub fn room_table_text<'a>(types: impl IntoIterator<Item = &'a String>) -> String {
    types
        .into_iter()
        .enumerate()
        .map(|(idx, room_type)| format!("{}: {}\n", room_type, idx + 1))
        .collect()
}
