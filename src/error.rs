//! Error types for the Votegate service.

use thiserror::Error;

/// Main error type for Votegate operations.
#[derive(Error, Debug)]
pub enum VotegateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A policy table that cannot be used to make decisions
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),

    /// Errors raised while layering configuration sources
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Votegate operations.
pub type Result<T> = std::result::Result<T, VotegateError>;
