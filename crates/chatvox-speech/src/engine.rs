//! Speech engine seam and the Piper-backed implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use chatvox_core::error::{ChatvoxError, Result};

/// Text-to-speech as the pipeline sees it: text in, WAV file out.
///
/// The handle is constructed once at startup and shared into the worker —
/// no ambient global engine state. Synthesis is allowed to block/await for
/// as long as it needs; the queue absorbs the latency.
#[async_trait]
pub trait SpeechEngine: Send + Sync + 'static {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()>;
}

/// [`SpeechEngine`] backed by the `piper` CLI: text on stdin, WAV to
/// `--output_file`.
pub struct PiperEngine {
    model: PathBuf,
}

impl PiperEngine {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        debug!(out_path = %out_path.display(), text_len = text.len(), "synthesizing");

        let mut child = tokio::process::Command::new("piper")
            .arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ChatvoxError::Synthesis(format!("spawn piper: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ChatvoxError::Synthesis(format!("write to piper: {e}")))?;
            // Dropping stdin closes the pipe so piper sees end of input.
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ChatvoxError::Synthesis(format!("wait for piper: {e}")))?;

        if !status.success() {
            return Err(ChatvoxError::Synthesis(format!(
                "piper exited with {status} for {}",
                out_path.display()
            )));
        }

        Ok(())
    }
}
