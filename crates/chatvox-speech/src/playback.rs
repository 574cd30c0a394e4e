//! Audio output seam and the rodio-backed device sink.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use chatvox_core::error::{ChatvoxError, Result};

/// Plays a finished artifact on the output device.
///
/// `play` resolves once the audio has been fully streamed to the device (or
/// failed). Failures are the caller's to log; they never block deletion.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    async fn play(&self, path: &Path) -> Result<()>;
}

/// [`AudioSink`] that decodes the WAV file and streams it to the default
/// output device via rodio.
pub struct RodioSink;

impl RodioSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, path: &Path) -> Result<()> {
        let path: PathBuf = path.to_path_buf();

        // rodio playback is blocking; keep it off the async workers.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let (_stream, handle) = rodio::OutputStream::try_default()
                .map_err(|e| ChatvoxError::Playback(format!("open output device: {e}")))?;

            let sink = rodio::Sink::try_new(&handle)
                .map_err(|e| ChatvoxError::Playback(format!("create sink: {e}")))?;

            let file = File::open(&path).map_err(|e| {
                ChatvoxError::Playback(format!("open {}: {e}", path.display()))
            })?;

            // Sample rate, channel count, and bit depth come from the WAV
            // header.
            let source = rodio::Decoder::new(BufReader::new(file)).map_err(|e| {
                ChatvoxError::Playback(format!("decode {}: {e}", path.display()))
            })?;

            sink.append(source);
            sink.sleep_until_end();

            debug!(path = %path.display(), "playback finished");
            Ok(())
        })
        .await
        .map_err(|e| ChatvoxError::Playback(format!("playback task: {e}")))?
    }
}
