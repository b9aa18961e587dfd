//! Common error types for the appraisal check service

use thiserror::Error;

/// Common result type for appraisal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the web service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (message is user-facing, in Czech)
    #[error("{0}")]
    InvalidInput(String),
}
