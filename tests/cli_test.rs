//! Binary tests: argument handling, exit codes and outputs

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Binary isolated from any local or user config file
fn answer_mask(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("answer-mask").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("HOME", dir)
        .env_remove("RUST_LOG");
    cmd
}

fn marked_page() -> RgbImage {
    let mut image = RgbImage::from_pixel(240, 200, Rgb([255, 255, 255]));
    for y in 80..110 {
        for x in 150..180 {
            image.put_pixel(x, y, Rgb([30, 170, 50]));
        }
    }
    image
}

fn page_dir(work: &TempDir) -> std::path::PathBuf {
    let pages = work.path().join("pages");
    std::fs::create_dir_all(&pages).unwrap();
    marked_page().save(pages.join("p1.png")).unwrap();
    pages
}

#[test]
fn test_help_lists_commands() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mask"))
        .stdout(predicate::str::contains("pairs"))
        .stdout(predicate::str::contains("deck"));
}

#[test]
fn test_version_flag() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_command_fails() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_input_exit_code() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .args(["mask", "missing.pdf", "out"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("missing.pdf"));
}

#[test]
fn test_invalid_hue_range_exit_code() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg("out")
        .args(["--h1", "90", "--h2", "40"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("hue"));
}

#[test]
fn test_missing_config_file_exit_code() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg("out")
        .args(["--config", "nope.toml"])
        .assert()
        .code(2);
}

#[test]
fn test_local_config_file_is_used() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    std::fs::write(work.path().join("answer-mask.toml"), "[mask.column]\nwidth = 0\n").unwrap();

    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg("out")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("width"));
}

#[test]
fn test_mask_image_directory() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    let out = work.path().join("out");
    let report = work.path().join("report.json");

    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg(&out)
        .args(["--mode", "green", "-q", "--report"])
        .arg(&report)
        .assert()
        .success();

    assert!(out.join("pages_masked.pdf").exists());
    let masked = image::open(out.join("masked_images/p1_masked.png")).unwrap().to_rgb8();
    assert_eq!(*masked.get_pixel(165, 95), Rgb([0, 0, 0]));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["mode"], "green");
    assert_eq!(json["pages"][0]["outcome"]["status"], "masked");
}

#[test]
fn test_no_images_flag() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    let out = work.path().join("out");

    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg(&out)
        .args(["--mode", "column", "--no-images", "-q"])
        .assert()
        .success();

    assert!(out.join("pages_masked.pdf").exists());
    assert!(!out.join("masked_images").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let work = TempDir::new().unwrap();
    let pages = page_dir(&work);
    let out = work.path().join("out");

    answer_mask(work.path())
        .arg("mask")
        .arg(&pages)
        .arg(&out)
        .args(["--dry-run", "--expand", "1.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry Run"))
        .stdout(predicate::str::contains("expand 1.5"));

    assert!(!out.exists());
}

#[test]
fn test_pairs_command() {
    let work = TempDir::new().unwrap();
    let exams = work.path().join("exams");
    std::fs::create_dir_all(&exams).unwrap();
    for name in [
        "Kemi VT2022 utan svar.pdf",
        "Kemi VT2022 facit.pdf",
        "Fysik HT2021 utan svar.pdf",
    ] {
        std::fs::write(exams.join(name), b"%PDF-1.4").unwrap();
    }

    answer_mask(work.path())
        .arg("pairs")
        .arg(&exams)
        .assert()
        .success()
        .stdout(predicate::str::contains("Kemi VT2022 facit.pdf"))
        .stdout(predicate::str::contains("1 pair(s), 1 unmatched"));
}

#[test]
fn test_pairs_missing_dir() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .args(["pairs", "no-such-dir"])
        .assert()
        .code(3);
}

#[test]
fn test_info_command() {
    let work = TempDir::new().unwrap();
    answer_mask(work.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config File Locations"))
        .stdout(predicate::str::contains("answer-mask.toml"));
}
