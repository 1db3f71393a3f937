use thiserror::Error;

pub type Result<T> = std::result::Result<T, TailerError>;

#[derive(Error, Debug)]
pub enum TailerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
