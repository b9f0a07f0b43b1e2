//! End-to-end tests of the masking pipeline over synthetic exam pages

use answer_mask::{
    AnchorLocator, AnchorOptions, BlobLocalizer, ColorRange, ColorSegmenter, Dispatcher,
    MaskConfig, MaskJob, MaskMode, MaskStrategy, PageOutcome, PdfRasterizer, RunConfig,
    SilentProgress, SkipReason,
};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use std::path::Path;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GREEN: Rgb<u8> = Rgb([20, 180, 40]);
const ROWS: [i32; 4] = [60, 120, 180, 240];

/// Option circles at x=60 on each row, green mark on `mark_row` (if any)
fn exam_page(mark_row: Option<i32>) -> RgbImage {
    let mut image = RgbImage::from_pixel(400, 340, WHITE);
    for y in ROWS {
        for r in 11..=13 {
            draw_hollow_circle_mut(&mut image, (60, y), r, BLACK);
        }
    }
    if let Some(row) = mark_row {
        for y in (row - 10)..(row + 10) {
            for x in 250..270 {
                image.put_pixel(x, y as u32, GREEN);
            }
        }
    }
    image
}

fn config(mode: MaskMode) -> RunConfig {
    RunConfig {
        threads: Some(2),
        mask: MaskConfig {
            mode,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn has_mark(image: &RgbImage) -> bool {
    let mask = ColorSegmenter::segment(image, &ColorRange::green());
    BlobLocalizer::largest(&mask, 100).is_some()
}

#[test]
fn test_anchors_found_on_exam_page() {
    let anchors = AnchorLocator::locate(&exam_page(Some(120)), &AnchorOptions::default());
    assert_eq!(anchors.len(), ROWS.len());
    for (anchor, y) in anchors.iter().zip(ROWS) {
        assert!((anchor.y - y as f32).abs() <= 3.0);
    }
}

#[test]
fn test_every_mode_hides_the_mark() {
    let page = exam_page(Some(120));
    for mode in [MaskMode::Green, MaskMode::Column, MaskMode::Replicate] {
        let masked = Dispatcher::new(&config(mode).mask).apply(&page);
        assert!(masked.outcome.is_masked(), "{} did not mask", mode);
        assert!(!has_mark(&masked.image), "{} left the mark visible", mode);
        assert_eq!(masked.image.dimensions(), page.dimensions());
    }
}

#[test]
fn test_replicate_covers_all_rows_equally() {
    let page = exam_page(Some(180));
    let masked = Dispatcher::new(&MaskConfig::default()).apply(&page);

    for y in ROWS {
        assert_eq!(*masked.image.get_pixel(260, y as u32), BLACK);
    }
    // Nothing between the option column and the answer column
    assert_eq!(*masked.image.get_pixel(150, 120), WHITE);
}

#[test]
fn test_masking_is_idempotent() {
    let page = exam_page(Some(60));
    for mode in [MaskMode::Green, MaskMode::Replicate] {
        let dispatcher = Dispatcher::new(&config(mode).mask);
        let first = dispatcher.apply(&page);
        let second = dispatcher.apply(&first.image);
        assert!(!second.outcome.is_masked());
        assert_eq!(second.image, first.image);
    }
}

#[test]
fn test_config_from_toml_drives_strategy() {
    let config = RunConfig::from_toml_str(
        r#"
        [mask]
        mode = "column"

        [mask.column]
        width = 60
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let dispatcher = Dispatcher::new(&config.mask);
    assert_eq!(dispatcher.mode(), MaskMode::Column);

    let masked = dispatcher.apply(&exam_page(Some(120)));
    match masked.outcome {
        PageOutcome::Masked { ops } => assert_eq!(ops.len(), 1),
        other => panic!("expected masked page, got {:?}", other),
    }
}

#[test]
fn test_image_directory_job() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("pages");
    let output = work.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    exam_page(Some(120)).save(input.join("page_001.png")).unwrap();
    exam_page(None).save(input.join("page_002.png")).unwrap();
    exam_page(Some(240)).save(input.join("page_003.png")).unwrap();

    let job = MaskJob::new(config(MaskMode::Replicate));
    let report = job.mask_images(&input, &output, &SilentProgress).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.masked_count(), 2);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(
        report.pages[1].outcome.skip_reason(),
        Some(SkipReason::MarkNotFound)
    );

    let pdf = report.output_pdf.clone().unwrap();
    assert_eq!(pdf, output.join("pages_masked.pdf"));
    assert_eq!(PdfRasterizer::page_count(&pdf).unwrap(), 3);

    let written = image::open(output.join("masked_images/page_003_masked.png"))
        .unwrap()
        .to_rgb8();
    assert!(!has_mark(&written));

    let json = report.to_json().unwrap();
    assert!(json.contains("\"mark_not_found\""));
}

#[test]
fn test_missing_directory() {
    let job = MaskJob::new(RunConfig::default());
    let result = job.mask_images(Path::new("/nonexistent/pages"), Path::new("/tmp/out"), &SilentProgress);
    assert!(result.is_err());
}
