use tokio::sync::mpsc;

/// A chat message extracted from the wire, stripped of protocol framing.
///
/// Carries no identity beyond the text — duplicates are legal and spoken
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Item flowing through the speech queue.
///
/// `Shutdown` is the end-of-stream sentinel: the worker stops consuming when
/// it dequeues one. A tagged variant rather than a bare null so the shutdown
/// case is unmissable at the type level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Message(ChatMessage),
    Shutdown,
}

/// Sender half of the speech queue (used by the protocol reader).
pub type QueueSender = mpsc::UnboundedSender<QueueItem>;

/// Receiver half of the speech queue (consumed by the speech worker).
pub type QueueReceiver = mpsc::UnboundedReceiver<QueueItem>;
