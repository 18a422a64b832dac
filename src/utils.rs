use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

/// Speaking rate used for duration estimates.
pub const WORDS_PER_MINUTE: u64 = 150;

/// True for an http(s) URL whose host belongs to one of `allowed_domains`.
pub fn validate_url(url: &str, allowed_domains: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    allowed_domains.iter().any(|d| host.contains(d.as_str()))
}

/// Lowercase `snake_case` name built from a page title, safe on any filesystem.
pub fn create_safe_filename(title: &str, max_len: usize, fallback: &str) -> String {
    static UNSAFE_RE: OnceLock<Regex> = OnceLock::new();
    static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();
    let unsafe_re = UNSAFE_RE.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let separator_re = SEPARATOR_RE.get_or_init(|| Regex::new(r"[-\s]+").unwrap());

    let cleaned = unsafe_re.replace_all(title, "");
    let joined = separator_re.replace_all(&cleaned, "_");
    let name: String = joined
        .trim_matches('_')
        .to_lowercase()
        .chars()
        .take(max_len)
        .collect();

    if name.is_empty() {
        fallback.to_string()
    } else {
        name
    }
}

/// Rough narration length for `text`.
pub fn estimate_audio_duration(text: &str, words_per_minute: u64) -> Duration {
    if words_per_minute == 0 {
        return Duration::ZERO;
    }
    let words = text.split_whitespace().count() as u64;
    Duration::from_secs(words * 60 / words_per_minute)
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    if bytes as f64 >= MB {
        format!("{:.2} MB", bytes as f64 / MB)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Cut to at most `max` characters, ending in "..." when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One-line preview of a block of text for log output.
pub fn clean_text_for_display(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&flat, max)
}
