use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{SpeechBackend, SpeechError};

const MIN_RATE: u32 = 80;
const MAX_RATE: u32 = 450;

/// Local `espeak-ng` process. Text goes in on stdin, a WAV stream comes out
/// on stdout.
pub struct EspeakTts {
    binary: String,
    base_rate: u32,
}

impl EspeakTts {
    pub fn new(binary: &str, base_rate: u32) -> Self {
        Self {
            binary: binary.to_string(),
            base_rate,
        }
    }

    /// Words per minute for a playback speed multiplier.
    fn rate(&self, speed: f32) -> u32 {
        let rate = (self.base_rate as f32 * speed).round() as u32;
        rate.clamp(MIN_RATE, MAX_RATE)
    }

    fn args(&self, language: &str, speed: f32) -> Vec<String> {
        vec![
            "--stdout".to_string(),
            "--stdin".to_string(),
            "-b".to_string(),
            "1".to_string(),
            "-v".to_string(),
            language.to_string(),
            "-s".to_string(),
            self.rate(speed).to_string(),
        ]
    }
}

#[async_trait]
impl SpeechBackend for EspeakTts {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    // Every WAV stream carries its own header.
    fn accepts_chunks(&self) -> bool {
        false
    }

    async fn synthesize(&self, text: &str, language: &str, speed: f32) -> Result<Vec<u8>, SpeechError> {
        let mut child = Command::new(&self.binary)
            .args(self.args(language, speed))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        // Feed stdin from a separate task so a full stdout pipe cannot stall us.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            SpeechError::Pipe(std::io::Error::other("child stdin was not captured"))
        })?;
        let input = text.to_string();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(SpeechError::Process {
                binary: self.binary.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        match writer.await {
            Ok(result) => result?,
            Err(e) => return Err(SpeechError::Pipe(std::io::Error::other(e))),
        }

        debug!(bytes = output.stdout.len(), "espeak-ng synthesized");
        if output.stdout.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_scales_with_speed() {
        let tts = EspeakTts::new("espeak-ng", 200);
        assert_eq!(tts.rate(1.0), 200);
        assert_eq!(tts.rate(1.5), 300);
        assert_eq!(tts.rate(0.25), MIN_RATE);
        assert_eq!(tts.rate(3.0), MAX_RATE);
    }

    #[test]
    fn command_line() {
        let tts = EspeakTts::new("espeak-ng", 200);
        assert_eq!(
            tts.args("es", 0.5),
            vec!["--stdout", "--stdin", "-b", "1", "-v", "es", "-s", "100"]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let tts = EspeakTts::new("definitely-not-an-installed-tts-binary", 200);
        let err = tts.synthesize("Hola.", "es", 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::Spawn { .. }), "{:?}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_process_reports_exit_code() {
        let tts = EspeakTts::new("false", 200);
        let err = tts.synthesize("Hola.", "es", 1.0).await.unwrap_err();
        assert!(matches!(err, SpeechError::Process { code: Some(1), .. }), "{:?}", err);
    }
}
