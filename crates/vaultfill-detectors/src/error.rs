use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A node could not be read mid-traversal (vanished, detached, or the
    /// tree is malformed)
    #[error("Traversal error: {0}")]
    Traversal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
