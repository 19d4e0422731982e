//! Keywarden error types.

use crate::license::validate::ValidationFailure;
use thiserror::Error;

/// Errors that can occur while loading, verifying or validating a license.
#[derive(Debug, Error)]
pub enum KeywardenError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The RSA public key text could not be parsed.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Malformed base64, JSON, UTF-8 or timestamp in a wire record.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The licensing server answered with an error result.
    #[error("Server rejected request: {0}")]
    ServerError(String),

    /// Signature verification failed.
    #[error("License signature verification failed")]
    SignatureInvalid,

    /// HTTP transport error communicating with the licensing server.
    #[error("Transport error: {0}")]
    Transport(String),

    /// License store I/O error.
    #[error("Store I/O error: {0}")]
    StoreIO(String),

    /// A stored license failed re-verification.
    #[error("Stored license tampering detected")]
    StoreTampered,

    /// A stored license is older than the offline grace period.
    #[error("Stored license expired (offline grace exceeded)")]
    StoreExpired,

    /// No license key provided.
    #[error("No license key provided")]
    MissingLicense,

    /// A validation predicate rejected the license.
    #[error("License validation failed: {0}")]
    Validation(ValidationFailure),

    /// A data object counter change would cross the caller's bound.
    #[error("Counter bound violated: {current} {delta:+} crosses bound {bound}")]
    BoundViolation {
        /// Counter value before the change.
        current: i64,
        /// Requested change (negative for decrements).
        delta: i64,
        /// Bound supplied by the caller.
        bound: i64,
    },
}

impl From<ValidationFailure> for KeywardenError {
    fn from(failure: ValidationFailure) -> Self {
        KeywardenError::Validation(failure)
    }
}
