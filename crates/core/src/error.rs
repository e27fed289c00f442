// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Payload database error: {0}")]
    Database(String),

    #[error("Duplicate engine name across languages: {0}")]
    DuplicateEngine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker error: {0}")]
    Worker(#[from] crate::port::WorkerError),

    #[error("Observed output {answer:?} for probe {probe:?} matches no remaining candidate")]
    Contradiction { probe: String, answer: String },

    #[error("Operator input closed")]
    OperatorClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
