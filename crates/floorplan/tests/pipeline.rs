use std::fs;
use std::path::Path;

use floorplan::dataset::{survey_room_types, OutputMode, INPUT_FILE, LABEL_FILE, PREVIEW_FILE};
use floorplan::{Converter, FloorplanError, GridShape, RoomTable, Shapes};
use image::{Rgb, RgbImage};

/// 100x50 plan: kitchen on the left half, an unknown room on the right.
const PLAN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="100" height="50">
  <g class="Model">
    <g class="Space Kitchen"><polygon points="0,0 50,0 50,50 0,50"/></g>
    <g class="Space Sauna"><polygon points="50,0 100,0 100,50 50,50"/></g>
    <g class="Space Bath"><polygon points="20,10 80,10 80,40 20,40"/></g>
  </g>
</svg>"#;

fn write_sample(root: &Path, rel: &str, svg: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).expect("create sample dir");
    RgbImage::from_pixel(100, 50, Rgb([200, 100, 50]))
        .save(dir.join("F1_scaled.png"))
        .expect("write png");
    fs::write(dir.join("model.svg"), svg).expect("write svg");
}

fn shapes() -> Shapes {
    Shapes {
        input: GridShape::new(16, 32),
        output: GridShape::new(10, 10),
    }
}

fn table() -> RoomTable {
    RoomTable::parse("Kitchen,Dining: 1\nBath: 2\n").unwrap()
}

#[test]
fn condensed_mode_stacks_every_sample() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    write_sample(root, "high_quality/1", PLAN);
    write_sample(root, "colorful/2", PLAN);
    fs::write(root.join("train.txt"), "/high_quality/1/\n/colorful/2/\n").unwrap();

    let table = table();
    let report = Converter::new(root, &table, shapes())
        .convert_split(&root.join("train.txt"), OutputMode::Condensed)
        .expect("convert split");

    assert_eq!(report.samples, 2);
    assert_eq!(report.rooms, 6);
    assert_eq!(report.matched, 4);
    assert_eq!(report.unmatched.get("Sauna"), Some(&2));

    let inputs = npy::read_file(root.join("train_inputs.npy")).unwrap();
    assert_eq!(inputs.shape(), &[2, 16, 32, 3]);
    let pixels = inputs.to_vec::<f32>().unwrap();
    assert!((pixels[0] - 200.0 / 255.0).abs() < 1e-4);

    let labels = npy::read_file(root.join("train_labels.npy")).unwrap();
    assert_eq!(labels.shape(), &[2, 10, 10]);
    let cells = labels.to_vec::<u8>().unwrap();

    // scale is x/10, y/5: kitchen covers columns 0..=5, bath columns 2..=8 rows 2..=8
    let at = |n: usize, x: usize, y: usize| cells[n * 100 + y * 10 + x];
    assert_eq!(at(0, 0, 0), 1);
    assert_eq!(at(0, 5, 0), 1);
    assert_eq!(at(0, 9, 0), 0);
    assert_eq!(at(0, 4, 4), 2);
    assert_eq!(at(0, 8, 8), 2);
    assert_eq!(at(0, 9, 9), 0);
    assert_eq!(at(1, 4, 4), 2);
}

#[test]
fn separate_mode_writes_one_pair_per_sample() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    write_sample(root, "high_quality/7", PLAN);
    fs::write(root.join("val.txt"), "/high_quality/7/\n").unwrap();

    let table = table();
    Converter::new(root, &table, shapes())
        .with_preview(true)
        .convert_split(&root.join("val.txt"), OutputMode::Separate)
        .expect("convert split");

    let out = root.join("val/high_quality/7");
    let input = npy::read_file(out.join(INPUT_FILE)).unwrap();
    assert_eq!(input.shape(), &[16, 32, 3]);

    let label = npy::read_file(out.join(LABEL_FILE)).unwrap();
    assert_eq!(label.shape(), &[10, 10]);
    assert_eq!(label.to_vec::<u8>().unwrap()[0], 1);

    let preview = image::open(out.join(PREVIEW_FILE)).unwrap();
    assert_eq!((preview.width(), preview.height()), (10, 10));
}

#[test]
fn a_broken_sample_aborts_the_split() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    write_sample(root, "a/1", PLAN);
    write_sample(
        root,
        "a/2",
        r#"<svg xmlns="http://www.w3.org/2000/svg"><g class="Space Bath"><rect/></g></svg>"#,
    );
    fs::write(root.join("test.txt"), "/a/1/\n/a/2/\n").unwrap();

    let table = table();
    let err = Converter::new(root, &table, shapes())
        .convert_split(&root.join("test.txt"), OutputMode::Separate)
        .unwrap_err();

    match err {
        FloorplanError::Sample { folder, source } => {
            assert!(folder.ends_with("a/2"));
            assert!(matches!(*source, FloorplanError::MissingPoints { .. }));
        }
        other => panic!("expected sample error, got {other:?}"),
    }
}

#[test]
fn survey_collects_sorted_distinct_room_types() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    write_sample(root, "colorful/1", PLAN);
    write_sample(
        root,
        "high_quality/2",
        r#"<svg xmlns="http://www.w3.org/2000/svg"><g class="Space Alcove"><polygon points="0,0 1,0 1,1"/></g></svg>"#,
    );

    let categories = vec!["colorful".to_owned(), "high_quality".to_owned()];
    let types = survey_room_types(root, &categories, "model.svg").unwrap();

    let types: Vec<&str> = types.iter().map(String::as_str).collect();
    assert_eq!(types, vec!["Alcove", "Bath", "Kitchen", "Sauna"]);
}
