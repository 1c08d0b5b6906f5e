//! Common error types for the review arena

use thiserror::Error;

/// Common result type for arena operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across arena services
///
/// `NotFound`, `Validation`, and `Unauthorized` are returned synchronously to
/// the caller and never broadcast. `ExternalService` is absorbed by the match
/// orchestrator and converted into a `failed` completion event carrying a
/// placeholder outcome.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Mutating call without identity and without explicit anonymous flag
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// External collaborator (agent runner, transport) unreachable
    #[error("External service unavailable: {0}")]
    ExternalService(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
