//! Speech synthesis and audio artifact lifecycle.
//!
//! The [`worker::SpeechWorker`] is the single sequential consumer of the
//! message queue: it renders each message to a WAV artifact through a
//! [`engine::SpeechEngine`], then hands the artifact to two independent
//! tracked tasks — playback via an [`playback::AudioSink`] and deletion
//! after a fixed grace period.

pub mod artifact;
pub mod engine;
pub mod playback;
pub mod worker;

pub use engine::{PiperEngine, SpeechEngine};
pub use playback::{AudioSink, RodioSink};
pub use worker::SpeechWorker;
