use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid snapshot structure: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
