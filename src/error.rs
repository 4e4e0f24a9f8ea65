use std::io;

use thiserror::Error;

/// Failures reported by the runtime collaborator.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("i/o: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Process-level failures that end the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("cannot connect to the docker daemon: {0}")]
    Connect(RuntimeError),

    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),
}
