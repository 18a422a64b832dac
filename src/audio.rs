use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::text::TextPipeline;
use crate::tts::SpeechBackend;

/// Outcome of one text → audio file conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    pub chunks: usize,
    pub requests: usize,
    pub bytes: u64,
}

pub struct AudioConverter {
    backend: Arc<dyn SpeechBackend>,
    language: String,
    speed: f32,
}

impl AudioConverter {
    pub fn new(backend: Arc<dyn SpeechBackend>, language: &str, speed: f32) -> Self {
        Self {
            backend,
            language: language.to_string(),
            speed,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.backend.file_extension()
    }

    /// Synthesize structured `text` and write it to `output_path`.
    ///
    /// Text that fits in one chunk, or a backend whose output cannot be
    /// joined, gets a single request; otherwise each chunk is synthesized in
    /// order and the byte streams are concatenated.
    pub async fn convert(&self, pipeline: &TextPipeline, text: &str, output_path: &Path) -> Result<ConversionReport> {
        let chunks = pipeline.split_into_chunks(text);
        if chunks.is_empty() {
            bail!("Nothing to narrate for {}", output_path.display());
        }

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let (audio, requests) = if chunks.len() == 1 || !self.backend.accepts_chunks() {
            debug!(backend = self.backend.name(), chunks = chunks.len(), "Single request");
            (self.synthesize(text).await?, 1)
        } else {
            info!("Synthesizing {} segments with {}", chunks.len(), self.backend.name());
            (self.synthesize_chunks(&chunks).await?, chunks.len())
        };

        tokio::fs::write(output_path, &audio)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        Ok(ConversionReport {
            chunks: chunks.len(),
            requests,
            bytes: audio.len() as u64,
        })
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.backend
            .synthesize(text, &self.language, self.speed)
            .await
            .with_context(|| format!("{} synthesis failed", self.backend.name()))
    }

    async fn synthesize_chunks(&self, chunks: &[String]) -> Result<Vec<u8>> {
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments")?
                .progress_chars("#>-"),
        );

        let mut combined = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let audio = self
                .synthesize(chunk)
                .await
                .with_context(|| format!("Segment {} of {}", i + 1, chunks.len()))?;
            combined.extend_from_slice(&audio);
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(combined)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::TextConfig;
    use crate::tts::SpeechError;

    /// Records every request and answers with the request text as "audio".
    struct EchoBackend {
        chunked: bool,
        calls: Mutex<Vec<String>>,
    }

    impl EchoBackend {
        fn new(chunked: bool) -> Arc<Self> {
            Arc::new(Self {
                chunked,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechBackend for EchoBackend {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn file_extension(&self) -> &'static str {
            "txt"
        }

        fn accepts_chunks(&self) -> bool {
            self.chunked
        }

        async fn synthesize(&self, text: &str, _language: &str, _speed: f32) -> Result<Vec<u8>, SpeechError> {
            self.calls.lock().unwrap().push(text.to_string());
            Ok(format!("[{}]", text).into_bytes())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl SpeechBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn file_extension(&self) -> &'static str {
            "mp3"
        }

        fn accepts_chunks(&self) -> bool {
            true
        }

        async fn synthesize(&self, _text: &str, _language: &str, _speed: f32) -> Result<Vec<u8>, SpeechError> {
            Err(SpeechError::Status { status: 503 })
        }
    }

    fn pipeline(max_chunk_size: usize) -> TextPipeline {
        TextPipeline::from_config(&TextConfig {
            max_chunk_size,
            ..TextConfig::default()
        })
        .unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("narrator-audio-{}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn short_text_is_one_request() {
        let backend = EchoBackend::new(true);
        let converter = AudioConverter::new(backend.clone(), "es", 1.0);
        let path = temp_path("short/unit_1.txt");

        let report = converter.convert(&pipeline(4000), "Hola. Qué tal.", &path).await.unwrap();

        // "é" is two bytes.
        assert_eq!(report, ConversionReport { chunks: 1, requests: 1, bytes: 17 });
        assert_eq!(backend.calls(), vec!["Hola. Qué tal."]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[Hola. Qué tal.]");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn long_text_is_synthesized_per_chunk_in_order() {
        let backend = EchoBackend::new(true);
        let converter = AudioConverter::new(backend.clone(), "es", 1.0);
        let path = temp_path("long/unit_2.txt");

        let report = converter
            .convert(&pipeline(10), "Hi there. Go now. Run fast.", &path)
            .await
            .unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.requests, 3);
        assert_eq!(backend.calls(), vec!["Hi there.", "Go now.", "Run fast."]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[Hi there.][Go now.][Run fast.]"
        );
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn unjoinable_backend_gets_whole_text() {
        let backend = EchoBackend::new(false);
        let converter = AudioConverter::new(backend.clone(), "es", 1.0);
        let path = temp_path("whole/unit_3.txt");

        let report = converter
            .convert(&pipeline(10), "Hi there. Go now. Run fast.", &path)
            .await
            .unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.requests, 1);
        assert_eq!(backend.calls(), vec!["Hi there. Go now. Run fast."]);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let backend = EchoBackend::new(true);
        let converter = AudioConverter::new(backend.clone(), "es", 1.0);
        let path = temp_path("empty/unit_4.txt");

        assert!(converter.convert(&pipeline(4000), "  ", &path).await.is_err());
        assert!(backend.calls().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn backend_failure_is_propagated() {
        let converter = AudioConverter::new(Arc::new(FailingBackend), "es", 1.0);
        let path = temp_path("failing/unit_5.mp3");

        let err = converter
            .convert(&pipeline(10), "Hi there. Go now.", &path)
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("HTTP 503"));
        assert!(!path.exists());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
