use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Tailer error: {0}")]
    TailerError(#[from] logwarden_tailer::TailerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] logwarden_vector_store::VectorStoreError),

    #[error("Analyzer error: {0}")]
    AnalyzerError(#[from] logwarden_analyzer::AnalyzerError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Other(String),
}
