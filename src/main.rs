mod audio;
mod config;
mod manifest;
mod scraper;
mod text;
mod tts;
mod utils;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::audio::AudioConverter;
use crate::config::{Settings, VoiceType};
use crate::manifest::{RunManifest, UnitFailure, UnitRecord};
use crate::scraper::{CourseScraper, CourseUnit};
use crate::text::TextPipeline;
use crate::tts::SpeechBackendFactory;
use crate::utils::{
    clean_text_for_display, create_safe_filename, estimate_audio_duration, format_duration, format_size,
    validate_url, WORDS_PER_MINUTE,
};

const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 2.0;

#[derive(Parser)]
#[command(name = "learn_narrator", about = "Turn a Microsoft Learn module into narrated audio files")]
struct Cli {
    /// Module URL (learn.microsoft.com)
    url: String,

    /// Output folder name (default: derived from the module title)
    #[arg(short, long)]
    output: Option<String>,

    /// Narration language code (e.g. "es", "en")
    #[arg(short, long)]
    language: Option<String>,

    /// Playback speed multiplier, 0.5 to 2.0
    #[arg(short, long)]
    speed: Option<f32>,

    /// Speech backend
    #[arg(long, value_enum)]
    voice: Option<VoiceType>,

    /// Longest text sent to the speech backend in one piece, in characters
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Settings file (default: ./narrator.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let t0 = Instant::now();
    let result = run(cli).await;

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli);

    let speed = settings.audio.speed;
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        bail!("Speed must be between {} and {} (got {})", MIN_SPEED, MAX_SPEED, speed);
    }
    if !validate_url(&cli.url, &settings.site.allowed_domains) {
        bail!(
            "Not a supported course URL: {} (allowed domains: {})",
            cli.url,
            settings.site.allowed_domains.join(", ")
        );
    }

    let scraper = CourseScraper::new(&settings.scraping, &settings.site)?;
    let pipeline = TextPipeline::from_config(&settings.text)?;
    let backend = SpeechBackendFactory::create(&settings.audio).context("Failed to set up speech backend")?;
    let converter = AudioConverter::new(backend, &settings.audio.language, speed);

    // Phase 1: Scrape
    let module = scraper.fetch_module(&cli.url).await?;
    let units = if module.units.is_empty() {
        warn!("No unit links found, narrating the module page itself");
        vec![CourseUnit {
            index: 1,
            url: module.url.to_string(),
            title: module.title.clone(),
            content: module.content.clone(),
        }]
    } else {
        scraper.fetch_units(&module.units).await?
    };
    if units.is_empty() {
        bail!("None of the {} units could be fetched", module.units.len());
    }

    // Phase 2: Clean
    let t_clean = Instant::now();
    let cleaned: Vec<String> = units
        .par_iter()
        .map(|u| pipeline.clean_and_structure(&u.content))
        .collect();
    debug!("Cleaned {} units in {:.2}s", units.len(), t_clean.elapsed().as_secs_f64());

    // Phase 3: Synthesize
    let files = &settings.files;
    let folder = create_safe_filename(
        cli.output.as_deref().unwrap_or(&module.title),
        files.max_filename_length,
        &files.fallback_filename,
    );
    let out_dir = files.output_directory.join(folder);
    std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    info!("Writing audio to {}", out_dir.display());

    let mut manifest = RunManifest::new(
        &module.title,
        module.url.as_str(),
        settings.audio.voice.as_str(),
        &settings.audio.language,
        speed,
    );

    let total = units.len();
    for (unit, text) in units.iter().zip(&cleaned) {
        if text.is_empty() {
            warn!("[{}/{}] {}: no narratable text, skipping", unit.index, total, unit.title);
            manifest.failures.push(UnitFailure {
                index: unit.index,
                title: unit.title.clone(),
                error: "no narratable text".to_string(),
            });
            continue;
        }

        let stem = create_safe_filename(&unit.title, files.max_filename_length, &format!("unit_{}", unit.index));
        let file = format!("unit_{}-{}.{}", unit.index, stem, converter.file_extension());
        let path = out_dir.join(&file);
        let estimate = estimate_audio_duration(text, WORDS_PER_MINUTE);

        info!(
            "[{}/{}] {} (~{})",
            unit.index,
            total,
            unit.title,
            format_duration(estimate)
        );
        debug!("{}", clean_text_for_display(text, 120));

        match converter.convert(&pipeline, text, &path).await {
            Ok(report) => {
                info!("Saved {} ({})", file, format_size(report.bytes));
                manifest.units.push(UnitRecord {
                    index: unit.index,
                    url: unit.url.clone(),
                    title: unit.title.clone(),
                    file,
                    chunks: report.chunks,
                    characters: text.chars().count(),
                    estimated_seconds: estimate.as_secs(),
                    bytes: report.bytes,
                });
            }
            Err(e) => {
                error!("[{}/{}] {} failed: {:#}", unit.index, total, unit.title, e);
                manifest.failures.push(UnitFailure {
                    index: unit.index,
                    title: unit.title.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    let manifest_path = out_dir.join(&files.manifest_name);
    manifest.write(&manifest_path)?;

    println!("\nModule:    {}", module.title);
    println!("Narrated:  {}/{} units", manifest.units.len(), total);
    if !manifest.failures.is_empty() {
        println!("Failed:    {}", manifest.failures.len());
    }
    println!("Size:      {}", format_size(manifest.total_bytes()));
    println!(
        "Duration:  ~{}",
        format_duration(Duration::from_secs(manifest.total_estimated_seconds()))
    );
    println!("Output:    {}", out_dir.display());

    if manifest.units.is_empty() {
        bail!("No audio files were produced");
    }
    Ok(())
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(language) = &cli.language {
        settings.audio.language = language.clone();
    }
    if let Some(speed) = cli.speed {
        settings.audio.speed = speed;
    }
    if let Some(voice) = cli.voice {
        settings.audio.voice = voice;
    }
    if let Some(size) = cli.max_chunk_size {
        settings.text.max_chunk_size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "learn_narrator",
            "https://learn.microsoft.com/es-es/training/modules/intro/",
            "-l",
            "en",
            "-s",
            "1.5",
            "--voice",
            "online",
            "--max-chunk-size",
            "500",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &cli);

        assert_eq!(settings.audio.language, "en");
        assert_eq!(settings.audio.speed, 1.5);
        assert_eq!(settings.audio.voice, VoiceType::Online);
        assert_eq!(settings.text.max_chunk_size, 500);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let cli = Cli::parse_from(["learn_narrator", "https://learn.microsoft.com/x/", "-o", "curso", "-v"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &cli);

        assert_eq!(cli.output.as_deref(), Some("curso"));
        assert!(cli.verbose);
        assert_eq!(settings.audio.language, "es");
        assert_eq!(settings.audio.voice, VoiceType::Offline);
        assert_eq!(settings.text.max_chunk_size, text::chunker::DEFAULT_MAX_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn out_of_range_speed_is_rejected() {
        let cli = Cli::parse_from(["learn_narrator", "https://learn.microsoft.com/x/", "-s", "3"]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("Speed must be between"));
    }

    #[tokio::test]
    async fn foreign_url_is_rejected() {
        let cli = Cli::parse_from(["learn_narrator", "https://example.com/course"]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("Not a supported course URL"));
    }
}
