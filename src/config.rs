//! Layered settings: built-in defaults, then an optional TOML file, then
//! `NARRATOR_*` environment variables. CLI flags are applied on top in `main`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::text::chunker::DEFAULT_MAX_CHUNK_SIZE;
use crate::text::classify::DEFAULT_FILTER_PHRASES;
use crate::text::normalize::DEFAULT_ALLOWLIST;

const DEFAULT_CONFIG_FILE: &str = "narrator";
const ENV_PREFIX: &str = "NARRATOR";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scraping: ScrapingConfig,
    pub text: TextConfig,
    pub audio: AudioConfig,
    pub files: FileConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Per-request timeout, seconds
    pub request_timeout_secs: u64,
    /// Pause between consecutive page requests, milliseconds
    pub request_delay_ms: u64,
    /// Cap for heuristic unit discovery
    pub max_units_per_module: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            request_delay_ms: 1000,
            max_units_per_module: 10,
            max_retries: 3,
            base_backoff_ms: 2000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3".to_string(),
        }
    }
}

/// Rule data for the text pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub max_chunk_size: usize,
    pub min_line_length: usize,
    pub heading_max_length: usize,
    /// Regex character-class body; characters outside it are deleted
    pub allowed_chars: String,
    /// Case-insensitive substrings marking a line as page chrome
    pub filter_phrases: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            min_line_length: 3,
            heading_max_length: 100,
            allowed_chars: DEFAULT_ALLOWLIST.to_string(),
            filter_phrases: DEFAULT_FILTER_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VoiceType {
    /// Google Translate TTS over HTTP (MP3)
    Online,
    /// Local espeak-ng process (WAV)
    Offline,
}

impl VoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub language: String,
    pub speed: f32,
    pub voice: VoiceType,
    pub google_tts_url: String,
    /// Longest text the online endpoint accepts per request
    pub google_max_request_chars: usize,
    pub espeak_binary: String,
    /// espeak-ng words per minute at speed 1.0
    pub espeak_base_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            speed: 1.0,
            voice: VoiceType::Offline,
            google_tts_url: "https://translate.google.com/translate_tts".to_string(),
            google_max_request_chars: 100,
            espeak_binary: "espeak-ng".to_string(),
            espeak_base_rate: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub output_directory: PathBuf,
    pub max_filename_length: usize,
    pub fallback_filename: String,
    pub manifest_name: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("output"),
            max_filename_length: 50,
            fallback_filename: "microsoft_learn_course".to_string(),
            manifest_name: "manifest.json".to_string(),
        }
    }
}

/// Where course pages live and how to find their content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub allowed_domains: Vec<String>,
    pub unit_link_selector: String,
    pub content_selectors: Vec<String>,
    pub title_selectors: Vec<String>,
    pub fallback_title: String,
    /// Shorter text blocks are skipped during extraction
    pub min_block_length: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            allowed_domains: strings(&["learn.microsoft.com", "docs.microsoft.com"]),
            unit_link_selector: "a.unit-title[href]".to_string(),
            content_selectors: strings(&[
                ".content",
                "main",
                "[role=\"main\"]",
                ".main-content",
                "article",
                ".module-content",
            ]),
            title_selectors: strings(&[
                "h1[data-bi-name=\"page-title\"]",
                "h1.title",
                "h1",
                ".page-title h1",
                "[data-bi-name=\"page-title\"]",
            ]),
            fallback_title: "Microsoft Learn Course".to_string(),
            min_block_length: 10,
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise `narrator.toml`
    /// in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Settings::default())
            .context("Failed to serialize default settings")?;

        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("text.filter_phrases")
                    .with_list_parse_key("site.allowed_domains")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_course_site() {
        let s = Settings::default();
        assert_eq!(s.text.max_chunk_size, 4000);
        assert_eq!(s.text.filter_phrases.len(), DEFAULT_FILTER_PHRASES.len());
        assert_eq!(s.scraping.max_units_per_module, 10);
        assert_eq!(s.files.max_filename_length, 50);
        assert_eq!(s.audio.voice, VoiceType::Offline);
        assert!(s.site.allowed_domains.contains(&"learn.microsoft.com".to_string()));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("narrator-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("narrator.toml");
        std::fs::write(
            &path,
            "[text]\nmax_chunk_size = 1500\nfilter_phrases = [\"cookie banner\"]\n\n[audio]\nvoice = \"online\"\nlanguage = \"en\"\n",
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.text.max_chunk_size, 1500);
        assert_eq!(s.text.filter_phrases, vec!["cookie banner".to_string()]);
        assert_eq!(s.text.min_line_length, 3);
        assert_eq!(s.audio.voice, VoiceType::Online);
        assert_eq!(s.audio.language, "en");
        assert_eq!(s.scraping.request_timeout_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = Path::new("/nonexistent/narrator.toml");
        assert!(Settings::load(Some(path)).is_err());
    }

    #[test]
    fn voice_type_names() {
        assert_eq!(VoiceType::Online.as_str(), "online");
        assert_eq!(VoiceType::Offline.as_str(), "offline");
    }
}
