//! Pairing of question PDFs with their answer-key PDFs.
//!
//! Exams come as two files, one without answers and one marked `facit`
//! (answer key). Pairs are found from file names alone: term (`HT22`,
//! `VT2023`), sitting (`ordinarie` / `rest`) and year must agree when both
//! names carry them, and the remaining words are compared by Jaccard overlap.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DeckConfig;

/// Default minimum similarity for a pair
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.3;

/// Similarity used when no comparable words remain
const NO_WORDS_SIMILARITY: f64 = 0.5;

const TERM_BONUS: f64 = 0.3;
const KIND_BONUS: f64 = 0.3;
const YEAR_BONUS: f64 = 0.2;

/// Pairing error types
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PairingError>;

/// Exam sitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    Ordinarie,
    Rest,
}

/// Identifying parts of an exam file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameKey {
    /// Term such as `vt2022` or `ht22`, lowercase
    pub term: Option<String>,
    pub kind: Option<ExamKind>,
    pub year: Option<String>,
}

/// A matched question/answer pair
#[derive(Debug, Clone, Serialize)]
pub struct ExamPair {
    pub question: PathBuf,
    pub answer: PathBuf,
    pub score: f64,
    /// Display title derived from the question file name
    pub title: String,
}

/// Result of pairing a directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairingResult {
    pub pairs: Vec<ExamPair>,
    /// Question files with no acceptable answer key
    pub unmatched: Vec<PathBuf>,
}

/// File name matcher
#[derive(Debug, Clone)]
pub struct NameMatcher {
    without_answers: Vec<Regex>,
    answer_word: Regex,
    pdf_suffix: Regex,
    term: Regex,
    kind: Regex,
    year: Regex,
    non_alnum: Regex,
    unsafe_dir_chars: Regex,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NameMatcher {
    pub fn new() -> Self {
        Self {
            without_answers: vec![
                Regex::new(r"(?i)\s*utan\s+svar\s*").unwrap(),
                Regex::new(r"(?i)\s*utan\s+facit\s*").unwrap(),
                Regex::new(r"(?i)\s*utan_facit\s*").unwrap(),
            ],
            answer_word: Regex::new(r"(?i)\s*facit\s*").unwrap(),
            pdf_suffix: Regex::new(r"(?i)\.pdf$").unwrap(),
            term: Regex::new(r"(ht|vt)\d{2,4}").unwrap(),
            kind: Regex::new(r"ordinarie|rest").unwrap(),
            year: Regex::new(r"20\d{2}").unwrap(),
            non_alnum: Regex::new(r"[^a-z0-9\s]").unwrap(),
            unsafe_dir_chars: Regex::new(r"[^A-Za-z0-9_-]+").unwrap(),
        }
    }

    /// Name with the "without answers" phrases removed
    pub fn clean_question(&self, name: &str) -> String {
        self.without_answers
            .iter()
            .fold(name.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned())
    }

    /// Name with the answer-key marker removed
    pub fn clean_answer(&self, name: &str) -> String {
        self.answer_word.replace_all(name, " ").into_owned()
    }

    /// Whether a file name denotes an answer key.
    ///
    /// "utan facit" (without answer key) names are questions.
    pub fn is_answer_key(&self, name: &str) -> bool {
        self.clean_question(name).to_lowercase().contains("facit")
    }

    pub fn key(&self, name: &str) -> NameKey {
        let lower = name.to_lowercase();
        let kind = if lower.contains("ordinarie") {
            Some(ExamKind::Ordinarie)
        } else if lower.contains("rest") {
            Some(ExamKind::Rest)
        } else {
            None
        };
        NameKey {
            term: self.term.find(&lower).map(|m| m.as_str().to_string()),
            kind,
            year: self.year.find(&lower).map(|m| m.as_str().to_string()),
        }
    }

    /// Words left after removing term, sitting, year and punctuation
    fn words(&self, name: &str) -> Vec<String> {
        let lower = name.to_lowercase();
        let cleaned = self.term.replace_all(&lower, "");
        let cleaned = self.kind.replace_all(&cleaned, "");
        let cleaned = self.year.replace_all(&cleaned, "");
        let cleaned = self.non_alnum.replace_all(&cleaned, " ");
        let mut words: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
        words.sort();
        words.dedup();
        words
    }

    /// Similarity of two cleaned names in `[0, 1]`.
    ///
    /// Zero when term, sitting or year is present in both and differs.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let ka = self.key(a);
        let kb = self.key(b);

        let mut bonus = 0.0;
        for (left, right, weight) in [
            (ka.term.as_deref(), kb.term.as_deref(), TERM_BONUS),
            (ka.kind.map(kind_name), kb.kind.map(kind_name), KIND_BONUS),
            (ka.year.as_deref(), kb.year.as_deref(), YEAR_BONUS),
        ] {
            if let (Some(l), Some(r)) = (left, right) {
                if l != r {
                    return 0.0;
                }
                bonus += weight;
            }
        }

        let wa = self.words(a);
        let wb = self.words(b);
        if wa.is_empty() || wb.is_empty() {
            return NO_WORDS_SIMILARITY;
        }

        let shared = wa.iter().filter(|w| wb.contains(w)).count();
        let union = wa.len() + wb.len() - shared;
        let base = shared as f64 / union as f64;

        (base + bonus).min(1.0)
    }

    /// Best answer key for each question, above `min_similarity`
    pub fn pair(&self, questions: &[PathBuf], answers: &[PathBuf], min_similarity: f64) -> PairingResult {
        let mut result = PairingResult::default();

        for question in questions {
            let q_name = self.clean_question(&file_name(question));
            let mut best: Option<(&PathBuf, f64)> = None;

            for answer in answers {
                let score = self.similarity(&q_name, &self.clean_answer(&file_name(answer)));
                let best_score = best.map(|(_, s)| s).unwrap_or(0.0);
                if score > best_score && score > min_similarity {
                    best = Some((answer, score));
                }
            }

            match best {
                Some((answer, score)) => {
                    debug!(question = %question.display(), answer = %answer.display(), score, "paired");
                    result.pairs.push(ExamPair {
                        question: question.clone(),
                        answer: answer.clone(),
                        score,
                        title: self.exam_title(&file_name(question)),
                    });
                }
                None => {
                    debug!(question = %question.display(), "no answer key");
                    result.unmatched.push(question.clone());
                }
            }
        }
        result
    }

    /// Pair every PDF in a directory
    pub fn find_pairs(&self, dir: &Path, min_similarity: f64) -> Result<PairingResult> {
        if !dir.is_dir() {
            return Err(PairingError::DirNotFound(dir.to_path_buf()));
        }

        let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
            })
            .collect();
        pdfs.sort();

        let (answers, questions): (Vec<PathBuf>, Vec<PathBuf>) = pdfs
            .into_iter()
            .partition(|path| self.is_answer_key(&file_name(path)));
        info!(questions = questions.len(), answers = answers.len(), "exam files found");

        Ok(self.pair(&questions, &answers, min_similarity))
    }

    /// Human title of an exam from its question file name
    pub fn exam_title(&self, file_name: &str) -> String {
        let base = self.pdf_suffix.replace(file_name, "");
        self.clean_question(&base)
            .trim_matches(|c| c == ' ' || c == '-' || c == '_')
            .to_string()
    }

    /// Directory-safe form of a title
    pub fn sanitize_dir_name(&self, name: &str) -> String {
        self.unsafe_dir_chars.replace_all(name, "_").into_owned()
    }
}

fn kind_name(kind: ExamKind) -> &'static str {
    match kind {
        ExamKind::Ordinarie => "ordinarie",
        ExamKind::Rest => "rest",
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Cover pages to skip for an exam title
pub fn guess_skip(title: &str, deck: &DeckConfig) -> usize {
    let lower = title.to_lowercase();
    deck.skip_overrides
        .iter()
        .find(|(key, _)| lower.contains(&key.to_lowercase()))
        .map(|(_, skip)| *skip)
        .unwrap_or(deck.default_skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
    }

    #[test]
    fn test_answer_key_classification() {
        let m = NameMatcher::new();
        assert!(m.is_answer_key("Tenta VT2022 Facit.pdf"));
        assert!(m.is_answer_key("facit_ht22.pdf"));
        assert!(!m.is_answer_key("Tenta VT2022 utan svar.pdf"));
        assert!(!m.is_answer_key("Tenta VT2022 utan facit.pdf"));
        assert!(!m.is_answer_key("Tenta_VT2022 utan_Facit.pdf"));
    }

    #[test]
    fn test_key_extraction() {
        let m = NameMatcher::new();
        let key = m.key("Rest Tentamen - Basvetenskap 3 - VT2022");
        assert_eq!(key.term.as_deref(), Some("vt2022"));
        assert_eq!(key.kind, Some(ExamKind::Rest));
        assert_eq!(key.year.as_deref(), Some("2022"));

        let key = m.key("Ordinarie rest HT21");
        assert_eq!(key.kind, Some(ExamKind::Ordinarie));
        assert_eq!(key.year, None);
    }

    #[test]
    fn test_similarity_identical_exams() {
        let m = NameMatcher::new();
        let q = m.clean_question("Tenta Basvetenskap 3 VT2022 utan svar.pdf");
        let a = m.clean_answer("Tenta Basvetenskap 3 VT2022 facit.pdf");
        assert_eq!(m.similarity(&q, &a), 1.0);
    }

    #[test]
    fn test_similarity_mismatch_is_zero() {
        let m = NameMatcher::new();
        assert_eq!(m.similarity("Tenta VT2022", "Tenta HT2022"), 0.0);
        assert_eq!(m.similarity("Ordinarie tenta", "Rest tenta"), 0.0);
        assert_eq!(m.similarity("Tenta 2021", "Tenta 2022"), 0.0);
    }

    #[test]
    fn test_similarity_word_overlap() {
        let m = NameMatcher::new();
        // {kemi, tenta} vs {fysik, tenta}
        let score = m.similarity("Kemi tenta", "Fysik tenta");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_without_words() {
        let m = NameMatcher::new();
        assert_eq!(m.similarity("VT22", "vt22 -"), 0.5);
    }

    #[test]
    fn test_similarity_bonus_capped() {
        let m = NameMatcher::new();
        let score = m.similarity("Ordinarie Kemi VT2022", "ordinarie kemi fysik vt2022");
        // 0.5 overlap + 0.3 + 0.3 + 0.2
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_exam_title() {
        let m = NameMatcher::new();
        assert_eq!(
            m.exam_title("Rest Tentamen - Basvetenskap 3 - VT2022 utan svar.pdf"),
            "Rest Tentamen - Basvetenskap 3 - VT2022"
        );
        assert_eq!(m.exam_title("_Kemi HT21 utan_facit.PDF"), "Kemi HT21");
    }

    #[test]
    fn test_sanitize_dir_name() {
        let m = NameMatcher::new();
        assert_eq!(
            m.sanitize_dir_name("Tenta Basvetenskap 3 - VT2022"),
            "Tenta_Basvetenskap_3_-_VT2022"
        );
        assert_eq!(m.sanitize_dir_name("Prov: höst/vår"), "Prov_h_st_v_r");
    }

    #[test]
    fn test_guess_skip() {
        let mut deck = DeckConfig::default();
        assert_eq!(guess_skip("Kemi HT21", &deck), 3);

        deck.skip_overrides.insert("basvetenskap 2".to_string(), 2);
        deck.skip_overrides.insert("HT22".to_string(), 4);
        assert_eq!(guess_skip("Tenta Basvetenskap 2 VT21", &deck), 2);
        assert_eq!(guess_skip("Kemi ht22", &deck), 4);
        assert_eq!(guess_skip("Kemi VT23", &deck), 3);
    }

    #[test]
    fn test_find_pairs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Tenta VT2022 utan svar.pdf");
        touch(dir.path(), "Tenta VT2022 facit.pdf");
        touch(dir.path(), "Tenta HT2022 utan svar.pdf");
        touch(dir.path(), "Tenta HT2022 facit.pdf");
        touch(dir.path(), "Fysik VT2021 utan facit.pdf");
        touch(dir.path(), "readme.txt");

        let result = NameMatcher::new()
            .find_pairs(dir.path(), DEFAULT_MIN_SIMILARITY)
            .unwrap();

        assert_eq!(result.pairs.len(), 2);
        for pair in &result.pairs {
            let q = file_name(&pair.question);
            let a = file_name(&pair.answer);
            assert_eq!(q[..12], a[..12]);
            assert_eq!(pair.score, 1.0);
        }
        assert_eq!(result.unmatched.len(), 1);
        assert!(file_name(&result.unmatched[0]).starts_with("Fysik"));
    }

    #[test]
    fn test_find_pairs_missing_dir() {
        let result = NameMatcher::new().find_pairs(Path::new("/nonexistent/exams"), 0.3);
        assert!(matches!(result, Err(PairingError::DirNotFound(_))));
    }
}
