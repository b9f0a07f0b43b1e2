//! answer-mask - hide the marked answers in scanned exams
//!
//! CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use answer_mask::{
    exit_codes,
    // CLI
    Cli, Commands, DeckArgs, MaskArgs, PairsArgs,
    // Config
    ConfigError, RunConfig,
    // Document
    DocumentError, JobReport, MaskJob, PdfRasterizer,
    // Flashcards
    DeckBuilder, NameMatcher, PairingError,
    // Progress
    OutputMode, ProcessingStage, ProgressCallback, SkipReason,
};

fn main() {
    let cli = Cli::parse();
    let mode = OutputMode::from_flags(cli.verbose, cli.quiet);
    init_logging(mode);

    let result = match &cli.command {
        Commands::Mask(args) => run_mask(args, mode),
        Commands::Pairs(args) => run_pairs(args),
        Commands::Deck(args) => run_deck(args, mode),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn init_logging(mode: OutputMode) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(mode.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        return exit_codes::INVALID_CONFIG;
    }
    let missing = matches!(
        error.downcast_ref::<DocumentError>(),
        Some(DocumentError::InputNotFound(_))
    ) || matches!(
        error.downcast_ref::<PairingError>(),
        Some(PairingError::DirNotFound(_))
    );
    if missing {
        exit_codes::INPUT_NOT_FOUND
    } else {
        exit_codes::GENERAL_ERROR
    }
}

/// Config file named on the command line, or the first one found
fn load_config(path: Option<&Path>) -> Result<RunConfig, ConfigError> {
    match path {
        Some(path) => RunConfig::load_from_path(path),
        None => RunConfig::load(),
    }
}

// ============ Progress Callback Implementation ============

/// Terminal progress bar
struct BarProgress {
    bar: ProgressBar,
    mode: OutputMode,
}

impl BarProgress {
    fn new(mode: OutputMode) -> Self {
        let bar = if mode == OutputMode::Quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        let style = ProgressStyle::with_template("{msg:>20} [{bar:40.cyan/blue}] {pos}/{len}")
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar, mode }
    }
}

impl ProgressCallback for BarProgress {
    fn on_stage(&self, stage: ProcessingStage, total: usize) {
        if stage == ProcessingStage::Completed {
            self.bar.finish_and_clear();
            return;
        }
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(stage.description());
    }

    fn on_page(&self, _page_index: usize) {
        self.bar.inc(1);
    }

    fn on_skip(&self, page_index: usize, reason: &SkipReason) {
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("  page {}: {}", page_index, reason));
        }
    }
}

// ============ Mask Command ============

fn run_mask(args: &MaskArgs, mode: OutputMode) -> Result<()> {
    let start_time = Instant::now();

    let config = load_config(args.config.as_deref())?.merge_with_cli(&args.to_overrides());
    config.validate()?;

    if !args.input.exists() {
        return Err(DocumentError::InputNotFound(args.input.clone()).into());
    }

    if args.dry_run {
        print_execution_plan(args, &config);
        return Ok(());
    }

    let job = MaskJob::new(config);
    let progress = BarProgress::new(mode);

    let report = if args.input.is_dir() {
        job.mask_images(&args.input, &args.output_dir, &progress)
    } else {
        job.run(&args.input, &args.output_dir, &progress)
    }
    .with_context(|| format!("failed to mask {}", args.input.display()))?;

    if let Some(path) = &args.report {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    if mode.should_show(OutputMode::Normal) {
        print_summary(&report);
        println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }
    Ok(())
}

fn print_summary(report: &JobReport) {
    println!();
    println!("=== Masking Summary ===");
    println!("Mode: {}", report.mode);
    println!("Pages: {}", report.total());
    println!("  Masked:    {}", report.masked_count());
    println!("  Untouched: {}", report.untouched_count());
    println!("  Skipped:   {}", report.skipped_count());
    for page in report.pages.iter() {
        if let Some(reason) = page.outcome.skip_reason() {
            println!("    page {}: {}", page.index, reason);
        }
    }
    if let Some(pdf) = &report.output_pdf {
        println!("PDF: {}", pdf.display());
    }
    if let Some(dir) = &report.image_dir {
        println!("Images: {}", dir.display());
    }
}

/// Print execution plan for dry-run mode
fn print_execution_plan(args: &MaskArgs, config: &RunConfig) {
    let mask = &config.mask;
    println!("=== Dry Run - Execution Plan ===");
    println!();
    println!("Input: {}", args.input.display());
    println!("Output: {}", args.output_dir.display());
    println!();
    println!("Pipeline:");
    if args.input.is_dir() {
        println!("  1. Load page images");
    } else {
        println!(
            "  1. Rasterize (DPI: {}, skipping {} page(s))",
            config.dpi, config.skip_pages
        );
    }
    println!("  2. Mask ({})", mask.mode);
    println!(
        "     Colour: hue {}-{}, s >= {}, v >= {}, min area {}",
        mask.color.h_low, mask.color.h_high, mask.color.s_low, mask.color.v_low, mask.blob.min_area
    );
    match mask.mode {
        answer_mask::MaskMode::Green => println!(
            "     Lines: canny {}/{}, thickness {}",
            mask.lines.canny_low, mask.lines.canny_high, mask.lines.thickness
        ),
        answer_mask::MaskMode::Column => println!(
            "     Column: x {}%, width {}px, {}%-{}%",
            mask.column.x_perc, mask.column.width, mask.column.top_perc, mask.column.bottom_perc
        ),
        answer_mask::MaskMode::Replicate => println!(
            "     Boxes: expand {}, shift ({}, {}), anchors {}-{}",
            mask.replicate.expand,
            mask.replicate.x_shift,
            mask.replicate.y_shift,
            mask.replicate.min_anchors,
            mask.anchor.max_anchors
        ),
    }
    if config.save_images {
        println!("  3. Page images: ENABLED");
    } else {
        println!("  3. Page images: DISABLED");
    }
    println!("  4. PDF output");
    println!();
    println!("Threads: {}", config.threads.unwrap_or_else(num_cpus::get));
}

// ============ Pairs Command ============

fn run_pairs(args: &PairsArgs) -> Result<()> {
    let config = RunConfig::load()?;
    let min_similarity = args.min_similarity.unwrap_or(config.deck.min_similarity);

    let result = NameMatcher::new().find_pairs(&args.dir, min_similarity)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for pair in &result.pairs {
        println!(
            "{:.2}  {}  <->  {}",
            pair.score,
            file_label(&pair.question),
            file_label(&pair.answer)
        );
    }
    for question in &result.unmatched {
        println!("  --  {}  (no answer key)", file_label(question));
    }
    println!();
    println!("{} pair(s), {} unmatched", result.pairs.len(), result.unmatched.len());
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============ Deck Command ============

fn run_deck(args: &DeckArgs, mode: OutputMode) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = &args.name {
        config.deck.name = name.clone();
    }
    if let Some(dpi) = args.dpi {
        config.deck.dpi = dpi;
    }
    if let Some(mask_mode) = args.mode {
        config.mask.mode = mask_mode;
    }
    config.validate()?;

    let mut builder = DeckBuilder::new(config.deck.clone()).with_package(!args.no_apkg);
    if args.mask_front {
        builder = builder.with_front_masking(&config.mask);
    }

    let manifest = builder
        .build(&args.dir, &args.work_dir)
        .with_context(|| format!("failed to build deck from {}", args.dir.display()))?;

    if mode.should_show(OutputMode::Normal) {
        println!("Deck '{}': {} card(s)", manifest.name, manifest.cards.len());
        println!(
            "Manifest: {}",
            args.work_dir.join(answer_mask::MANIFEST_FILE).display()
        );
        if let Some(package) = &manifest.package {
            println!("Anki package: {}", args.work_dir.join(package).display());
        }
    }
    Ok(())
}

// ============ Info Command ============

fn run_info() -> Result<()> {
    println!("answer-mask v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    println!();
    println!("PDF Tools:");
    check_tool_with_version(answer_mask::document::PDFTOPPM, "Poppler", &["-v"]);
    if !PdfRasterizer::is_available() {
        println!("  (PDF input needs pdftoppm; image directories work without it)");
    }

    println!();
    println!("Config File Locations:");
    for path in RunConfig::search_paths() {
        let state = if path.is_file() { "found" } else { "absent" };
        println!("  {} ({})", path.display(), state);
    }

    Ok(())
}

fn check_tool_with_version(cmd: &str, name: &str, version_args: &[&str]) {
    match which::which(cmd) {
        Ok(path) => {
            // pdftoppm prints its version on stderr
            let version = std::process::Command::new(&path)
                .args(version_args)
                .output()
                .ok()
                .and_then(|output| {
                    let text = [output.stdout, output.stderr].concat();
                    String::from_utf8_lossy(&text)
                        .lines()
                        .next()
                        .map(|l| l.trim().to_string())
                })
                .filter(|line| !line.is_empty() && line.len() < 80);
            match version {
                Some(v) => println!("  {}: {} ({})", name, v, path.display()),
                None => println!("  {}: {} (found)", name, path.display()),
            }
        }
        Err(_) => println!("  {}: Not found", name),
    }
}
