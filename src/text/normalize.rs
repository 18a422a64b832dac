use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static HSPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());
static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());
static DOTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").unwrap());
static QUESTIONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?{2,}").unwrap());
static BANGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}").unwrap());

/// Regex character-class body of everything the speech backends can read aloud.
pub const DEFAULT_ALLOWLIST: &str = r#"\w\s\-.,;:!?¡¿áéíóúñüÁÉÍÓÚÑÜ()\[\]"'/"#;

/// Whitespace and punctuation canonicalization, run before filtering and again
/// after structuring.
#[derive(Debug, Clone)]
pub struct Normalizer {
    disallowed: Regex,
}

impl Normalizer {
    /// Build from a character-class body; anything outside the class is deleted.
    pub fn new(allowlist: &str) -> Result<Self> {
        let disallowed = Regex::new(&format!("[^{}]", allowlist))
            .with_context(|| format!("Invalid character allowlist: {}", allowlist))?;
        Ok(Self { disallowed })
    }

    /// First pass over raw extracted text.
    pub fn normalize(&self, text: &str) -> String {
        let text = HSPACE_RE.replace_all(text, " ");
        let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
        let text = self.disallowed.replace_all(&text, "");
        let text = DOTS_RE.replace_all(&text, ".");
        let text = QUESTIONS_RE.replace_all(&text, "?");
        BANGS_RE.replace_all(&text, "!").into_owned()
    }

    /// Second pass over structured text: spacing, blank-line runs, per-line trim.
    pub fn tidy(&self, text: &str) -> String {
        let text = SPACE_RUN_RE.replace_all(text, " ");
        let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
        text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n")
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        // The built-in allowlist is a literal and always compiles.
        Self::new(DEFAULT_ALLOWLIST).unwrap()
    }
}
