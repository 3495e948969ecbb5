use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host channel unavailable: {0}")]
    Channel(String),

    #[error("Field write failed: {0}")]
    Write(String),

    #[error("Invalid password options: {0}")]
    InvalidOptions(String),

    #[error("Random source failed")]
    Random,

    #[error(transparent)]
    Core(#[from] vaultfill_core::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
