use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatvoxError {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Read failure: {0}")]
    Read(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatvoxError>;
