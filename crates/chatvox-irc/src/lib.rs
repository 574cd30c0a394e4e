//! Twitch IRC connection and protocol reader.
//!
//! [`session`] opens the TCP stream and performs the join handshake;
//! [`reader`] turns the raw byte stream into chat messages on the speech
//! queue and keeps the connection alive by answering server PINGs.

pub mod reader;
pub mod session;

pub use reader::Reader;
pub use session::Session;
