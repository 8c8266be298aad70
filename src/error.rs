use thiserror::Error;

/// Errors surfaced by the solver library.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid card notation: {0}")]
    InvalidCard(String),

    #[error("Invalid board: {0}")]
    InvalidBoard(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
