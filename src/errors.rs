use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompanionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Download cancelled")]
    Cancelled,
    #[error("A transfer is already in progress")]
    TransferBusy,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
}

impl CompanionError {
    /// User-initiated cancellation is the one failure callers are expected
    /// to suppress instead of surfacing as an error toast.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompanionError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CompanionError>;
