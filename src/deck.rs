//! Flashcard deck builder.
//!
//! Each paired exam becomes a run of cards: the question page on the front,
//! the matching answer-key page on the back. Card images and a `deck.json`
//! manifest are written under a work directory, and the cards are packed
//! into an Anki `.apkg` with the images as media.

use genanki_rs::{Deck, Field, Model, Note, Package, Template};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DeckConfig, MaskConfig};
use crate::document::{DocumentError, PageRaster, PdfRasterizer};
use crate::pairing::{guess_skip, ExamPair, NameMatcher, PairingError};
use crate::strategy::{Dispatcher, MaskStrategy};

/// Manifest file name inside the work directory
pub const MANIFEST_FILE: &str = "deck.json";

/// Anki package file name inside the work directory
pub const APKG_FILE: &str = "deck.apkg";

/// Note model id; stable so re-imports reuse the note type
pub const MODEL_ID: i64 = 21022026;

const MODEL_NAME: &str = "Exam Side-by-Side";

const FRONT_TEMPLATE: &str = r#"{{Front}}<div class="meta">{{Meta}}</div>"#;

const BACK_TEMPLATE: &str = r#"{{Front}}<hr id="answer" style="margin: 15px 0; border: 1px solid #ccc;">{{Back}}<div class="meta">{{Meta}}</div>"#;

const CARD_CSS: &str = r#".card {
    font-family: -apple-system, Segoe UI, Arial;
    font-size: 16px;
    text-align: center;
}
img {
    max-width: 100%;
    height: auto;
    border: 1px solid #ddd;
    border-radius: 4px;
    box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    margin: 5px 0;
}
.front-img {
    margin-bottom: 10px;
}
.back-img {
    margin-top: 10px;
}
.meta {
    font-size: 12px;
    color: #666;
    margin-top: 8px;
    font-style: italic;
}
"#;

/// Deck building error types
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("Pairing failed: {0}")]
    Pairing(#[from] PairingError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to write manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Failed to write Anki package: {0}")]
    Package(String),

    #[error("No cards were created")]
    NoCards,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;

/// One flashcard; image paths are relative to the work directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub front: PathBuf,
    pub back: PathBuf,
    pub meta: String,
}

/// Contents of `deck.json`
#[derive(Debug, Clone, Serialize)]
pub struct DeckManifest {
    pub name: String,
    pub dpi: u32,
    pub cards: Vec<Card>,
    /// Question files without an answer key
    pub unmatched: Vec<PathBuf>,
    /// Anki package, relative to the work directory
    pub package: Option<PathBuf>,
}

/// Builds card images and the manifest
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    config: DeckConfig,
    matcher: NameMatcher,
    front_mask: Option<Dispatcher>,
    package: bool,
}

impl DeckBuilder {
    pub fn new(config: DeckConfig) -> Self {
        Self {
            config,
            matcher: NameMatcher::new(),
            front_mask: None,
            package: true,
        }
    }

    /// Write `deck.apkg` next to the manifest (on by default)
    #[must_use]
    pub fn with_package(mut self, enabled: bool) -> Self {
        self.package = enabled;
        self
    }

    /// Mask the question pages with the given strategy before writing them
    #[must_use]
    pub fn with_front_masking(mut self, mask: &MaskConfig) -> Self {
        self.front_mask = Some(Dispatcher::new(mask));
        self
    }

    /// Pair the PDFs in `exam_dir` and write the deck under `work_dir`
    pub fn build(&self, exam_dir: &Path, work_dir: &Path) -> Result<DeckManifest> {
        let pairing = self.matcher.find_pairs(exam_dir, self.config.min_similarity)?;
        for question in &pairing.unmatched {
            warn!(question = %question.display(), "no answer key found");
        }

        std::fs::create_dir_all(work_dir)?;
        let rasterizer = PdfRasterizer::new(self.config.dpi)?;

        let mut cards = Vec::new();
        for pair in &pairing.pairs {
            let skip = guess_skip(&pair.title, &self.config);
            info!(title = %pair.title, skip, score = pair.score, "building cards");

            let fronts = rasterizer.rasterize(&pair.question, skip)?;
            let backs = rasterizer.rasterize(&pair.answer, skip)?;
            let made = self.write_cards(pair, fronts, backs, work_dir)?;
            if made.is_empty() {
                warn!(title = %pair.title, skip, "no pages left after skip");
            }
            cards.extend(made);
        }

        if cards.is_empty() {
            return Err(DeckError::NoCards);
        }

        let package = if self.package {
            let out = work_dir.join(APKG_FILE);
            let notes = write_package(&self.config, &cards, work_dir, &out)?;
            info!(notes, file = APKG_FILE, "anki package written");
            Some(PathBuf::from(APKG_FILE))
        } else {
            None
        };

        let manifest = DeckManifest {
            name: self.config.name.clone(),
            dpi: self.config.dpi,
            cards,
            unmatched: pairing.unmatched,
            package,
        };
        std::fs::write(work_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
        info!(cards = manifest.cards.len(), dir = %work_dir.display(), "deck written");
        Ok(manifest)
    }

    /// Write front/back images for one exam, truncating to the shorter side
    pub fn write_cards(
        &self,
        pair: &ExamPair,
        fronts: Vec<PageRaster>,
        backs: Vec<PageRaster>,
        work_dir: &Path,
    ) -> Result<Vec<Card>> {
        let dir_name = self.matcher.sanitize_dir_name(&pair.title);
        let out_dir = work_dir.join(&dir_name);
        std::fs::create_dir_all(&out_dir)?;

        let mut cards = Vec::with_capacity(fronts.len().min(backs.len()));
        for (front, back) in fronts.into_iter().zip(backs) {
            let front_image = match &self.front_mask {
                Some(dispatcher) => dispatcher.apply(&front.image).image,
                None => front.image,
            };

            let front_name = format!("front_{:03}.png", front.index);
            let back_name = format!("back_{:03}.png", back.index);
            front_image.save(out_dir.join(&front_name))?;
            back.image.save(out_dir.join(&back_name))?;

            cards.push(Card {
                front: Path::new(&dir_name).join(front_name),
                back: Path::new(&dir_name).join(back_name),
                meta: format!("{} – page {}", pair.title, front.index),
            });
        }
        Ok(cards)
    }
}

/// Card note type: Front, Back and Meta fields on one template
pub fn note_model() -> Model {
    Model::new_with_options(
        MODEL_ID,
        MODEL_NAME,
        vec![Field::new("Front"), Field::new("Back"), Field::new("Meta")],
        vec![Template::new("Card").qfmt(FRONT_TEMPLATE).afmt(BACK_TEMPLATE)],
        Some(CARD_CSS),
        None,
        None,
        None,
        None,
    )
}

/// Pack `cards` (images under `work_dir`) into an Anki package at `out`.
///
/// Anki keys media by bare file name, so every image is staged under a
/// name derived from its full relative path. Returns the number of notes.
pub fn write_package(
    config: &DeckConfig,
    cards: &[Card],
    work_dir: &Path,
    out: &Path,
) -> Result<usize> {
    let model = note_model();
    let mut deck = Deck::new(config.deck_id, &config.name, "");

    let staging = tempfile::tempdir()?;
    let mut media = Vec::with_capacity(cards.len() * 2);
    for card in cards {
        let front = stage_media(work_dir, &card.front, staging.path())?;
        let back = stage_media(work_dir, &card.back, staging.path())?;

        let fields = [
            format!(r#"<div class="front-img"><img src="{}"></div>"#, front.0),
            format!(r#"<div class="back-img"><img src="{}"></div>"#, back.0),
            card.meta.clone(),
        ];
        let note = Note::new(model.clone(), fields.iter().map(String::as_str).collect())
            .map_err(|e| DeckError::Package(e.to_string()))?;
        deck.add_note(note);
        media.push(front.1);
        media.push(back.1);
    }

    let media_paths: Vec<&str> = media.iter().map(String::as_str).collect();
    let mut package =
        Package::new(vec![deck], media_paths).map_err(|e| DeckError::Package(e.to_string()))?;
    let out = out
        .to_str()
        .ok_or_else(|| DeckError::Package(format!("non-UTF-8 path {}", out.display())))?;
    package
        .write_to_file(out)
        .map_err(|e| DeckError::Package(e.to_string()))?;
    Ok(cards.len())
}

/// Copy one card image into `staging`; returns (media name, staged path)
fn stage_media(work_dir: &Path, relative: &Path, staging: &Path) -> Result<(String, String)> {
    let name = media_name(relative);
    let staged = staging.join(&name);
    std::fs::copy(work_dir.join(relative), &staged)?;
    Ok((name, staged.to_string_lossy().into_owned()))
}

/// `Kemi_HT21/front_004.png` -> `Kemi_HT21_front_004.png`
fn media_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("_")
}
