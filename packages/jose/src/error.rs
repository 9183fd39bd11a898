//! Error handling for the JOSE engine

use thiserror::Error;

/// Algorithm family an identifier was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    /// `alg` of a JWS
    Signing,
    /// `alg` of a JWE
    KeyEncryption,
    /// `enc` of a JWE
    ContentEncryption,
}

impl std::fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signing => f.write_str("signing"),
            Self::KeyEncryption => f.write_str("key encryption"),
            Self::ContentEncryption => f.write_str("content encryption"),
        }
    }
}

/// JOSE-specific errors
#[derive(Debug, Error)]
pub enum JoseError {
    /// Malformed wire structure: part count, base64 or document shape
    #[error("Malformed token: {0}")]
    Format(String),

    /// No algorithm registered under the given id
    #[error("Unsupported {family} algorithm: {id}")]
    UnsupportedAlgorithm {
        /// Registry the id was looked up in
        family: AlgorithmFamily,
        /// The offending identifier
        id: String,
    },

    /// A required key could not be resolved
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// Key material has the wrong length or encoding
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A codec was asked to use a key half it does not hold
    #[error("Key usage error: {0}")]
    KeyUsage(String),

    /// An underlying primitive failed
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Signature or authentication tag did not verify
    #[error("Token authentication failed")]
    Authentication,

    /// A document could not be written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Conflicting algorithm registration
    #[error("Registry error: {0}")]
    Registry(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JoseError {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an unsupported algorithm error
    pub fn unsupported(family: AlgorithmFamily, id: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            family,
            id: id.into(),
        }
    }

    /// Create a missing key error
    pub fn missing_key(msg: impl Into<String>) -> Self {
        Self::MissingKey(msg.into())
    }

    /// Create an invalid key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// True for signature and tag failures
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}

impl From<base64::DecodeError> for JoseError {
    fn from(err: base64::DecodeError) -> Self {
        JoseError::Format(format!("Base64 decode error: {err}"))
    }
}

/// Result type for JOSE operations
pub type JoseResult<T> = std::result::Result<T, JoseError>;
