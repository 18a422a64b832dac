pub mod chunker;
pub mod classify;
pub mod heading;
pub mod normalize;
pub mod structure;

use anyhow::Result;
use tracing::{debug, trace};

use crate::config::TextConfig;
use chunker::DEFAULT_MAX_CHUNK_SIZE;
use classify::{LineClassifier, RuleClassifier};
use heading::{CaseHeadingDetector, HeadingDetector};
use normalize::Normalizer;

pub use chunker::split_into_chunks;

/// Four-pass pipeline: normalize → drop noise lines → structure → tidy.
///
/// Immutable once built, so one instance can clean many units concurrently.
pub struct TextPipeline {
    normalizer: Normalizer,
    classifier: Box<dyn LineClassifier>,
    headings: Box<dyn HeadingDetector>,
    max_chunk_size: usize,
}

impl TextPipeline {
    pub fn new(
        normalizer: Normalizer,
        classifier: Box<dyn LineClassifier>,
        headings: Box<dyn HeadingDetector>,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            headings,
            max_chunk_size,
        }
    }

    /// Build the rule-based pipeline from the `[text]` settings.
    pub fn from_config(cfg: &TextConfig) -> Result<Self> {
        Ok(Self::new(
            Normalizer::new(&cfg.allowed_chars)?,
            Box::new(RuleClassifier::new(&cfg.filter_phrases, cfg.min_line_length)),
            Box::new(CaseHeadingDetector::new(cfg.heading_max_length)),
            cfg.max_chunk_size,
        ))
    }

    /// Turn raw extracted page text into speech-ready prose.
    pub fn clean_and_structure(&self, raw_text: &str) -> String {
        if raw_text.trim().is_empty() {
            return String::new();
        }

        let text = self.normalizer.normalize(raw_text);
        let text = self.filter_lines(&text);
        let text = structure::structure_for_audio(&text, self.headings.as_ref());
        let text = self.normalizer.tidy(&text);
        text.trim().to_string()
    }

    /// Keep content lines (trimmed, in order); drop noise lines.
    pub fn filter_lines(&self, text: &str) -> String {
        let mut kept = Vec::new();
        let mut dropped = 0usize;

        for line in text.split('\n') {
            let line = line.trim();
            if self.classifier.is_noise(line) {
                if !line.is_empty() {
                    trace!(line, "Dropping noise line");
                    dropped += 1;
                }
                continue;
            }
            kept.push(line);
        }

        debug!(kept = kept.len(), dropped, "Filtered extracted lines");
        kept.join("\n")
    }

    /// Sentence-aligned chunks bounded by the configured ceiling.
    pub fn split_into_chunks(&self, text: &str) -> Vec<String> {
        split_into_chunks(text, self.max_chunk_size)
    }
}

impl Default for TextPipeline {
    fn default() -> Self {
        Self::new(
            Normalizer::default(),
            Box::new(RuleClassifier::default()),
            Box::new(CaseHeadingDetector::default()),
            DEFAULT_MAX_CHUNK_SIZE,
        )
    }
}

// ── Tests ──
