//! Artifact naming and working-directory management.

use std::path::{Path, PathBuf};

use chatvox_core::error::Result;

/// Names per-message WAV artifacts inside the working directory.
///
/// The base name is `message_<unix-timestamp>.wav`. Messages landing within
/// the same second get a `_<seq>` suffix so a later artifact can never
/// overwrite an earlier one that is still being played.
pub struct ArtifactNamer {
    dir: PathBuf,
    last_ts: i64,
    seq: u32,
}

impl ArtifactNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_ts: 0,
            seq: 0,
        }
    }

    /// Path for the next artifact, unique for the lifetime of this namer.
    pub fn next(&mut self) -> PathBuf {
        self.name_for(chrono::Utc::now().timestamp())
    }

    fn name_for(&mut self, ts: i64) -> PathBuf {
        if ts == self.last_ts {
            self.seq += 1;
        } else {
            self.last_ts = ts;
            self.seq = 0;
        }

        let name = if self.seq == 0 {
            format!("message_{ts}.wav")
        } else {
            format!("message_{ts}_{}.wav", self.seq)
        };
        self.dir.join(name)
    }
}

/// Create the working directory if it does not exist yet.
pub fn ensure_work_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}
