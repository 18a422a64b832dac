use std::sync::LazyLock;

use regex::Regex;

static DURATION_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*(min|sec|hr|minute|second|hour)").unwrap());
static STEP_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(step \d+|unit \d+|\d+\.)$").unwrap());

const LINK_PREFIXES: &[&str] = &["http", "www.", "mailto:"];
const DURATION_SUFFIXES: &[&str] = &["min", "sec", "hr"];

/// Navigation, UI and feedback boilerplate found on course pages (English and Spanish).
pub const DEFAULT_FILTER_PHRASES: &[&str] = &[
    "skip to main content",
    "breadcrumb navigation",
    "table of contents",
    "in this article",
    "next steps",
    "feedback",
    "was this page helpful",
    "submit and view feedback",
    "microsoft learn",
    "sign in",
    "search",
    "browse",
    "theme",
    "light",
    "dark",
    "high contrast",
    "previous unit",
    "next unit",
    "completed",
    "check your knowledge",
    "knowledge check",
    "leer en ingles",
    "agregar",
    "agregar al plan",
    "logros",
    "preguntar a learn",
    "completado",
    "comentarios",
    "le ha resultado util esta pagina",
    "minutos",
];

/// Why a line was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoiseReason {
    TooShort,
    Phrase(String),
    Link,
    DurationSuffix,
    DurationPrefix,
    StepMarker,
}

/// Decides whether an extracted line is course content or page chrome.
pub trait LineClassifier: Send + Sync {
    fn is_noise(&self, line: &str) -> bool;
}

/// Phrase list plus structural patterns; first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    phrases: Vec<String>,
    min_line_len: usize,
}

impl RuleClassifier {
    pub fn new<S: AsRef<str>>(phrases: &[S], min_line_len: usize) -> Self {
        let phrases = phrases
            .iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            phrases,
            min_line_len,
        }
    }

    pub fn noise_reason(&self, line: &str) -> Option<NoiseReason> {
        let line = line.trim();
        if line.chars().count() < self.min_line_len {
            return Some(NoiseReason::TooShort);
        }

        let lower = line.to_lowercase();
        if let Some(phrase) = self.phrases.iter().find(|p| lower.contains(p.as_str())) {
            return Some(NoiseReason::Phrase(phrase.clone()));
        }
        if LINK_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return Some(NoiseReason::Link);
        }
        if DURATION_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return Some(NoiseReason::DurationSuffix);
        }
        if DURATION_PREFIX_RE.is_match(&lower) {
            return Some(NoiseReason::DurationPrefix);
        }
        if STEP_MARKER_RE.is_match(&lower) {
            return Some(NoiseReason::StepMarker);
        }
        None
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_PHRASES, 3)
    }
}

impl LineClassifier for RuleClassifier {
    fn is_noise(&self, line: &str) -> bool {
        self.noise_reason(line).is_some()
    }
}

// ── Tests ──
