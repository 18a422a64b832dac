use std::sync::LazyLock;

use regex::Regex;

/// Default ceiling for one speech request, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4000;

// Terminal punctuation followed by whitespace; the split keeps the punctuation.
static SENTENCE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Split `text` into sentences, breaking after `.`, `!` or `?` that is
/// followed by whitespace. Empty sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK_RE.find_iter(text) {
        // The punctuation mark is ASCII, so `m.start() + 1` is a char boundary.
        let sentence = text[start..m.start() + 1].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Greedily pack whole sentences into chunks of at most `max_chunk_size`
/// characters. A sentence longer than the ceiling becomes its own chunk.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let mut canonical = sentence.to_string();
        if !canonical.ends_with(['.', '!', '?']) {
            canonical.push('.');
        }
        canonical.push(' ');
        let len = canonical.chars().count();

        if current_len + len > max_chunk_size && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
            current_len = 0;
        }
        current.push_str(&canonical);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}
