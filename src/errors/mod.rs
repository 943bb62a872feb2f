//! # Error Handling
//!
//! This module provides error handling for the keyplane trust core.
//! It defines custom error types using `thiserror` shared by the crypto,
//! auth, rotation, and template layers.

/// Custom result type for keyplane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the keyplane trust core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (bad keys, unusable settings, exhausted password lists)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller contract violations (empty inputs, out-of-range lengths, bad templates)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Authenticated decryption failed. Deliberately carries no detail about
    /// whether the tag, the nonce, or the ciphertext was at fault.
    #[error("Decryption failed: authentication tag mismatch")]
    BadTag,

    /// Request denied. The logs carry the reason; the caller does not.
    #[error("Unauthorized")]
    Unauthorized,

    /// Keystore container errors (truncated data, unsupported entries, bad magic)
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new keystore error
    pub fn keystore<S: Into<String>>(message: S) -> Self {
        Self::Keystore(message.into())
    }

    /// Get the HTTP status code an embedding service should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::InvalidArgument(_) => 400,
            Error::BadTag => 401,
            Error::Unauthorized => 401,
            Error::Keystore(_) => 500,
            Error::Serialization(_) => 400,
            Error::Io(_) => 500,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Error::Config(err.to_string())
    }
}
