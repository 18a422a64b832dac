use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{SpeechBackend, SpeechError};
use crate::text::split_into_chunks;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Translate's public TTS endpoint. Returns MP3 frames, which can be
/// concatenated directly.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    max_request_chars: usize,
}

impl GoogleTts {
    pub fn new(endpoint: &str, max_request_chars: usize) -> Result<Self, SpeechError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_request_chars: max_request_chars.max(1),
        })
    }

    /// Sentence-aligned pieces short enough for one request. Sentences that
    /// are still too long are wrapped at word boundaries.
    fn request_pieces(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for chunk in split_into_chunks(text, self.max_request_chars) {
            if chunk.chars().count() <= self.max_request_chars {
                pieces.push(chunk);
            } else {
                pieces.extend(wrap_words(&chunk, self.max_request_chars));
            }
        }
        pieces
    }

    fn request_url(&self, piece: &str, language: &str, speed: f32, idx: usize, total: usize) -> String {
        format!(
            "{}?ie=UTF-8&client=tw-ob&tl={}&q={}&total={}&idx={}&textlen={}&ttsspeed={}",
            self.endpoint,
            urlencoding::encode(language),
            urlencoding::encode(piece),
            total,
            idx,
            piece.chars().count(),
            speed,
        )
    }
}

#[async_trait]
impl SpeechBackend for GoogleTts {
    fn name(&self) -> &'static str {
        "google"
    }

    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    fn accepts_chunks(&self) -> bool {
        true
    }

    async fn synthesize(&self, text: &str, language: &str, speed: f32) -> Result<Vec<u8>, SpeechError> {
        let pieces = self.request_pieces(text);
        let mut audio = Vec::new();

        for (idx, piece) in pieces.iter().enumerate() {
            let url = self.request_url(piece, language, speed, idx, pieces.len());
            let resp = self.client.get(&url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SpeechError::Status {
                    status: status.as_u16(),
                });
            }
            audio.extend_from_slice(&resp.bytes().await?);
        }

        debug!(requests = pieces.len(), bytes = audio.len(), "Google TTS synthesized");
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }
}

/// Greedy word wrap; a single word longer than `max` is cut by characters.
fn wrap_words(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };

        if needed <= max {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len <= max {
            current.push_str(word);
            current_len = word_len;
        } else {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max) {
                lines.push(piece.iter().collect());
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
