//! The speech worker: single sequential consumer of the message queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use chatvox_core::types::{ChatMessage, QueueItem, QueueReceiver};

use crate::artifact::ArtifactNamer;
use crate::engine::SpeechEngine;
use crate::playback::AudioSink;

/// Delay between an artifact becoming ready and its deletion. Bounds cleanup
/// without synchronizing on playback completion.
pub const GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Renders queued messages to WAV artifacts, one at a time, and schedules
/// playback and deferred deletion for each.
///
/// Synthesis is deliberately not parallelized: one worker on one FIFO queue
/// is what keeps messages spoken in arrival order.
pub struct SpeechWorker {
    engine: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
    namer: ArtifactNamer,
    tracker: TaskTracker,
    grace_period: Duration,
}

impl SpeechWorker {
    /// Playback and deletion tasks are spawned on `tracker`, so shutdown can
    /// wait for in-flight artifacts after the worker exits.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        sink: Arc<dyn AudioSink>,
        work_dir: impl Into<PathBuf>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            engine,
            sink,
            namer: ArtifactNamer::new(work_dir),
            tracker,
            grace_period: GRACE_PERIOD,
        }
    }

    #[cfg(test)]
    fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Consume the queue until the shutdown sentinel (or the last sender)
    /// arrives.
    pub async fn run(mut self, mut queue: QueueReceiver) {
        while let Some(item) = queue.recv().await {
            match item {
                QueueItem::Shutdown => {
                    info!("shutdown sentinel received, worker stopping");
                    break;
                }
                QueueItem::Message(message) => self.speak(message).await,
            }
        }
    }

    /// Synthesize one message and schedule its artifact's lifecycle.
    ///
    /// A synthesis failure drops the message: nothing is played or deleted
    /// for it, and the worker moves straight on to the next one.
    async fn speak(&mut self, message: ChatMessage) {
        let path = self.namer.next();

        if let Err(e) = self.engine.synthesize(&message.text, &path).await {
            warn!(error = %e, text = message.text, "dropping message, synthesis failed");
            return;
        }

        debug!(path = %path.display(), "artifact ready");

        let sink = Arc::clone(&self.sink);
        let play_path = path.clone();
        self.tracker.spawn(async move {
            if let Err(e) = sink.play(&play_path).await {
                warn!(error = %e, path = %play_path.display(), "playback failed");
            }
        });

        // Deletion is scheduled immediately and waits out the grace period
        // on its own; it must not depend on playback finishing.
        let grace_period = self.grace_period;
        self.tracker.spawn(async move {
            tokio::time::sleep(grace_period).await;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "artifact deleted"),
                Err(e) => warn!(error = %e, path = %path.display(), "failed to delete artifact"),
            }
        });
    }
}
