pub mod espeak;
pub mod google;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AudioConfig, VoiceType};
use espeak::EspeakTts;
use google::GoogleTts;

/// Text in, encoded audio out.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    /// Whether audio synthesized piecewise can be joined by appending bytes.
    fn accepts_chunks(&self) -> bool;

    async fn synthesize(&self, text: &str, language: &str, speed: f32) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("speech service returned HTTP {status}")]
    Status { status: u16 },
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} exited with {code:?}: {stderr}")]
    Process {
        binary: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("audio pipe error: {0}")]
    Pipe(#[from] std::io::Error),
    #[error("speech backend returned no audio")]
    EmptyAudio,
}

pub struct SpeechBackendFactory;

impl SpeechBackendFactory {
    pub fn create(cfg: &AudioConfig) -> Result<Arc<dyn SpeechBackend>, SpeechError> {
        match cfg.voice {
            VoiceType::Online => {
                let backend = GoogleTts::new(&cfg.google_tts_url, cfg.google_max_request_chars)?;
                Ok(Arc::new(backend))
            }
            VoiceType::Offline => Ok(Arc::new(EspeakTts::new(&cfg.espeak_binary, cfg.espeak_base_rate))),
        }
    }
}
