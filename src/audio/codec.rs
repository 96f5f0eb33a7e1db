//! External Opus transcoder bridge
//!
//! Compression for the audio cache runs through an external `ffmpeg`
//! binary. Its absence is an expected, non-fatal outcome; callers fall
//! back to raw PCM.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::SYNTH_SAMPLE_RATE;

/// Transcoder failure modes
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No transcoder binary on this system
    #[error("ffmpeg not available")]
    Unavailable,

    /// The transcoder ran but failed
    #[error("ffmpeg failed: {0}")]
    Failed(String),
}

/// PCM <-> Opus converter backed by an external ffmpeg process
pub struct OpusCodec {
    ffmpeg: Option<PathBuf>,
}

impl OpusCodec {
    /// Locate ffmpeg on the current system
    #[must_use]
    pub fn detect() -> Self {
        let ffmpeg = which::which("ffmpeg").ok();
        if ffmpeg.is_none() {
            tracing::debug!("ffmpeg not found, cache compression disabled");
        }
        Self { ffmpeg }
    }

    /// A codec that always reports [`CodecError::Unavailable`]
    #[must_use]
    pub fn unavailable() -> Self {
        Self { ffmpeg: None }
    }

    /// Whether a transcoder binary was found
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.ffmpeg.is_some()
    }

    /// Encode raw PCM (24 kHz 16-bit mono) to Opus
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unavailable`] if ffmpeg is missing, or
    /// [`CodecError::Failed`] if the conversion fails
    pub async fn encode(&self, pcm: &[u8]) -> Result<Vec<u8>, CodecError> {
        let rate = SYNTH_SAMPLE_RATE.to_string();
        self.run(
            &[
                "-f", "s16le", "-ar", &rate, "-ac", "1", "-i", "pipe:0", "-c:a", "libopus",
                "-b:a", "24k", "-f", "opus", "pipe:1",
            ],
            pcm,
        )
        .await
    }

    /// Decode Opus back to raw PCM (24 kHz 16-bit mono)
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unavailable`] if ffmpeg is missing, or
    /// [`CodecError::Failed`] if the conversion fails
    pub async fn decode(&self, opus: &[u8]) -> Result<Vec<u8>, CodecError> {
        let rate = SYNTH_SAMPLE_RATE.to_string();
        self.run(
            &["-i", "pipe:0", "-f", "s16le", "-ar", &rate, "-ac", "1", "pipe:1"],
            opus,
        )
        .await
    }

    async fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let ffmpeg = self.ffmpeg.as_ref().ok_or(CodecError::Unavailable)?;

        let mut child = Command::new(ffmpeg)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CodecError::Failed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CodecError::Failed("no stdin handle".to_string()))?;
        let payload = input.to_vec();
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&payload).await;
            // dropping stdin closes the pipe so ffmpeg sees EOF
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CodecError::Failed(e.to_string()))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("unknown error");
            return Err(CodecError::Failed(last.to_string()));
        }

        Ok(output.stdout)
    }
}

impl Default for OpusCodec {
    fn default() -> Self {
        Self::detect()
    }
}
