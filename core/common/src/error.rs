//! Common error types for muxd.

use thiserror::Error;

/// Top-level error type for muxd operations.
///
/// Every layer of the daemon (registries, multiplexers, providers and the
/// dispatcher) reports failures through this one enum so that errors raised
/// by a provider can travel unchanged through the multiplexer above it.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded, parsed or validated.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider id was registered twice in the same registry.
    #[error("Duplicate {kind} provider: '{id}' is already registered")]
    DuplicateProvider { kind: &'static str, id: String },

    /// A registry lookup missed.
    #[error("Unknown {kind} provider: '{id}' is not registered")]
    ProviderNotFound { kind: &'static str, id: String },

    /// Credentials or a token were rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request body exceeds the accepted size.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No API or operation matches the request.
    #[error("No route: {0}")]
    Routing(String),

    /// Unexpected fault, including panics caught at the operation boundary.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case label for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::DuplicateProvider { .. } => "duplicate_provider",
            Error::ProviderNotFound { .. } => "provider_not_found",
            Error::Auth(_) => "auth",
            Error::Storage(_) => "storage",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::InvalidInput(_) => "invalid_input",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::Routing(_) => "routing",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
