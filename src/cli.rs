//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;
use crate::strategy::MaskMode;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_CONFIG: i32 = 2;
    pub const INPUT_NOT_FOUND: i32 = 3;
}

/// Hide the marked answers in scanned multiple-choice exams
#[derive(Debug, Parser)]
#[command(name = "answer-mask", version, about, long_about = None)]
pub struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mask the marked answers in a PDF or a directory of page images
    Mask(MaskArgs),
    /// List question / answer-key pairs found in a directory
    Pairs(PairsArgs),
    /// Build flashcard images, a manifest and an Anki package from paired exams
    Deck(DeckArgs),
    /// Show tool availability and config file locations
    Info,
}

#[derive(Debug, Args)]
pub struct MaskArgs {
    /// Input PDF, or a directory of PNG/JPEG pages
    pub input: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Masking policy
    #[arg(long, value_enum)]
    pub mode: Option<MaskMode>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rasterization DPI [default: 220]
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Leading pages to leave out
    #[arg(long)]
    pub skip_pages: Option<usize>,

    /// Worker threads [default: CPU count]
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Lower hue bound (0-179) [default: 35]
    #[arg(long = "h1")]
    pub h_low: Option<u8>,

    /// Upper hue bound (0-179) [default: 85]
    #[arg(long = "h2")]
    pub h_high: Option<u8>,

    /// Minimum saturation [default: 40]
    #[arg(long = "s1")]
    pub s_low: Option<u8>,

    /// Minimum value [default: 40]
    #[arg(long = "v1")]
    pub v_low: Option<u8>,

    /// Minimum mark area in pixels [default: 100]
    #[arg(long)]
    pub min_area: Option<u32>,

    /// Canny low threshold [default: 20]
    #[arg(long)]
    pub th_low: Option<f32>,

    /// Canny high threshold [default: 80]
    #[arg(long)]
    pub th_high: Option<f32>,

    /// Stroke thickness for detected lines [default: 12]
    #[arg(long)]
    pub line_thickness: Option<u32>,

    /// Column centre as % of page width (column mode) [default: 82]
    #[arg(long)]
    pub col_x_perc: Option<f32>,

    /// Column width in pixels (column mode) [default: 120]
    #[arg(long)]
    pub col_width: Option<u32>,

    /// Column top as % of page height (column mode) [default: 20]
    #[arg(long)]
    pub col_top_perc: Option<f32>,

    /// Column bottom as % of page height (column mode) [default: 65]
    #[arg(long)]
    pub col_bot_perc: Option<f32>,

    /// Box scale relative to the mark (replicate mode) [default: 1.2]
    #[arg(long)]
    pub expand: Option<f32>,

    /// Horizontal box shift in pixels (replicate mode)
    #[arg(long, allow_negative_numbers = true)]
    pub x_shift: Option<i32>,

    /// Vertical box shift in pixels (replicate mode)
    #[arg(long, allow_negative_numbers = true)]
    pub y_shift: Option<i32>,

    /// Anchors required to mask a page (replicate mode) [default: 3]
    #[arg(long)]
    pub min_anchors: Option<usize>,

    /// Maximum anchors per page (replicate mode) [default: 5]
    #[arg(long)]
    pub max_anchors: Option<usize>,

    /// Do not write per-page PNGs
    #[arg(long)]
    pub no_images: bool,

    /// Write a JSON report of per-page outcomes to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Show the execution plan without processing
    #[arg(long)]
    pub dry_run: bool,
}

impl MaskArgs {
    /// Values given on the command line, for merging over the config file
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            dpi: self.dpi,
            skip_pages: self.skip_pages,
            threads: self.threads,
            save_images: self.no_images.then_some(false),
            mode: self.mode,
            h_low: self.h_low,
            h_high: self.h_high,
            s_low: self.s_low,
            v_low: self.v_low,
            min_area: self.min_area,
            canny_low: self.th_low,
            canny_high: self.th_high,
            line_thickness: self.line_thickness,
            expand: self.expand,
            x_shift: self.x_shift,
            y_shift: self.y_shift,
            min_anchors: self.min_anchors,
            max_anchors: self.max_anchors,
            col_x_perc: self.col_x_perc,
            col_width: self.col_width,
            col_top_perc: self.col_top_perc,
            col_bot_perc: self.col_bot_perc,
        }
    }
}

#[derive(Debug, Args)]
pub struct PairsArgs {
    /// Directory containing the exam PDFs
    pub dir: PathBuf,

    /// Minimum name similarity for a pair [default: 0.3]
    #[arg(long)]
    pub min_similarity: Option<f64>,

    /// Print pairs as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeckArgs {
    /// Directory containing the exam PDFs
    pub dir: PathBuf,

    /// Directory for card images, deck.json and deck.apkg
    pub work_dir: PathBuf,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Deck name
    #[arg(long)]
    pub name: Option<String>,

    /// Rasterization DPI for cards [default: 300]
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Mask the answers on the question side
    #[arg(long)]
    pub mask_front: bool,

    /// Masking policy used with --mask-front
    #[arg(long, value_enum)]
    pub mode: Option<MaskMode>,

    /// Skip writing deck.apkg
    #[arg(long)]
    pub no_apkg: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mask_args() {
        let cli = Cli::try_parse_from([
            "answer-mask",
            "mask",
            "exam.pdf",
            "out",
            "--mode",
            "column",
            "--h1",
            "40",
            "--x-shift",
            "-6",
            "--no-images",
        ])
        .unwrap();

        let Commands::Mask(args) = cli.command else {
            panic!("expected mask command");
        };
        assert_eq!(args.input, PathBuf::from("exam.pdf"));
        assert_eq!(args.mode, Some(MaskMode::Column));

        let overrides = args.to_overrides();
        assert_eq!(overrides.h_low, Some(40));
        assert_eq!(overrides.x_shift, Some(-6));
        assert_eq!(overrides.save_images, Some(false));
        assert_eq!(overrides.h_high, None);
    }

    #[test]
    fn test_images_flag_absent_keeps_config() {
        let cli = Cli::try_parse_from(["answer-mask", "mask", "pages", "out"]).unwrap();
        let Commands::Mask(args) = cli.command else {
            panic!("expected mask command");
        };
        assert_eq!(args.to_overrides().save_images, None);
    }

    #[test]
    fn test_global_verbosity() {
        let cli = Cli::try_parse_from(["answer-mask", "info", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Info));
    }

    #[test]
    fn test_deck_args() {
        let cli = Cli::try_parse_from(["answer-mask", "deck", "exams", "build", "--mask-front"]).unwrap();
        match cli.command {
            Commands::Deck(args) => {
                assert!(args.mask_front);
                assert!(!args.no_apkg);
                assert_eq!(args.work_dir, PathBuf::from("build"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_deck_without_apkg() {
        let cli = Cli::try_parse_from(["answer-mask", "deck", "exams", "build", "--no-apkg"]).unwrap();
        let Commands::Deck(args) = cli.command else {
            panic!("expected deck command");
        };
        assert!(args.no_apkg);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["answer-mask", "mask", "a.pdf", "out", "--mode", "blur"]).is_err());
    }
}
