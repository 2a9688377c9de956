use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use htmap::cli::{self, CliArgs};
use htmap::io::{load_image, save_image};
use htmap::{BrushMode, HeatConfig, Session};
use image::{Rgba, RgbaImage};

const BG: Rgba<u8> = Rgba([247, 247, 247, 255]);
const INK: Rgba<u8> = Rgba([30, 30, 30, 255]);

/// 80x60 map with a light blue landmass, a gray border line and a dark label.
fn sample_map() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(80, 60, BG);
    for y in 10..50 {
        for x in 15..65 {
            img.put_pixel(x, y, Rgba([215, 225, 240, 255]));
        }
    }
    for y in 0..60 {
        img.put_pixel(70, y, Rgba([150, 150, 150, 255]));
    }
    for x in 35..45 {
        img.put_pixel(x, 30, INK);
    }
    img
}

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("htmap-flow-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn plain_map_is_bootstrapped_and_labels_survive_rendering() {
    let map = sample_map();
    let mut session = Session::new(map.clone(), &HeatConfig::default()).unwrap();

    // The landmass was flooded, the border line and label were not.
    assert!(session.field().get(20, 15) > 0.0);
    assert_eq!(session.field().get(70, 5), 0.0);
    assert!(session.field().is_protected(40, 30));

    session.stamp(40.0, 30.0, BrushMode::Add).unwrap();
    let out = session.render().unwrap();
    for x in 35..45 {
        assert_eq!(*out.get_pixel(x, 30), INK);
    }
    assert_ne!(out.get_pixel(40, 25), map.get_pixel(40, 25));
    assert_eq!(out.dimensions(), map.dimensions());
}

#[test]
fn existing_heat_colors_skip_the_filler() {
    let mut map = sample_map();
    for y in 20..26 {
        for x in 20..26 {
            map.put_pixel(x, y, Rgba([255, 90, 90, 255]));
        }
    }
    let session = Session::new(map, &HeatConfig::default()).unwrap();
    assert!(session.field().get(22, 22) > 0.9);
    // No flood: the blue landmass away from the hot patch stays cold.
    assert_eq!(session.field().get(60, 45), 0.0);
}

#[test]
fn edits_undo_back_to_the_first_render() {
    let mut session = Session::new(sample_map(), &HeatConfig::default()).unwrap();
    let first = session.render().unwrap();

    session.stamp(30.0, 20.0, BrushMode::Add).unwrap();
    session.stamp(50.0, 40.0, BrushMode::Remove).unwrap();
    session.set_stop_color(0, "#ff00ff").unwrap();
    assert_ne!(session.render().unwrap(), first);

    while session.undo_heat().unwrap() {}
    while session.undo_ramp() {}
    assert_eq!(session.render().unwrap(), first);
}

#[test]
fn cli_renders_a_single_file() {
    let dir = scratch_dir();
    let input = dir.join("map.png");
    let output = dir.join("heat.png");
    save_image(&sample_map(), &input).unwrap();

    let args = CliArgs::try_parse_from([
        "htmap",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--add",
        "40,20",
        "--blur",
        "0",
    ])
    .unwrap();
    assert_eq!(cli::run(args), ExitCode::SUCCESS);

    let rendered = load_image(&output).unwrap();
    assert_eq!(rendered.dimensions(), (80, 60));
    assert_eq!(*rendered.get_pixel(40, 30), INK);
}

#[test]
fn cli_batch_writes_into_output_dir() {
    let dir = scratch_dir();
    save_image(&sample_map(), &dir.join("a.png")).unwrap();
    save_image(&sample_map(), &dir.join("b.png")).unwrap();
    let out_dir = dir.join("out");
    let pattern = dir.join("*.png");

    let args = CliArgs::try_parse_from([
        "htmap",
        "-i",
        pattern.to_str().unwrap(),
        "--output-dir",
        out_dir.to_str().unwrap(),
        "--auto-color",
    ])
    .unwrap();
    assert_eq!(cli::run(args), ExitCode::SUCCESS);
    assert!(out_dir.join("a.png").exists());
    assert!(out_dir.join("b.png").exists());
}

#[test]
fn cli_reports_failure_for_unmatched_input() {
    let dir = scratch_dir();
    let args = CliArgs::try_parse_from([
        "htmap",
        "-i",
        dir.join("missing-*.png").to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(cli::run(args), ExitCode::FAILURE);
}
