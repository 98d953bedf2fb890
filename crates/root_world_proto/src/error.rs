use std::fmt;
use std::io;

/// Configuration-stage failures: key material, identity/endpoint strings,
/// root-declaration documents. Every variant is fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidKeyMaterial { reason: String },
    MalformedIdentity { value: String, reason: String },
    MalformedEndpoint { value: String, reason: String },
    MalformedDeclaration { reason: String },
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidKeyMaterial { reason } => {
                write!(f, "invalid key material: {}", reason)
            }
            ConfigError::MalformedIdentity { value, reason } => {
                write!(f, "malformed identity {:?}: {}", value, reason)
            }
            ConfigError::MalformedEndpoint { value, reason } => {
                write!(f, "malformed endpoint {:?}: {}", value, reason)
            }
            ConfigError::MalformedDeclaration { reason } => {
                write!(f, "malformed root declaration: {}", reason)
            }
            ConfigError::Io(reason) => write!(f, "io error: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(error: io::Error) -> Self {
        ConfigError::Io(error.to_string())
    }
}

/// Wire-level failures of the canonical World encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    Malformed { reason: String },
    TooLarge { len: usize, max: usize },
    RoundTripMismatch,
}

impl SerializationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SerializationError::Malformed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::Malformed { reason } => {
                write!(f, "malformed world encoding: {}", reason)
            }
            SerializationError::TooLarge { len, max } => {
                write!(f, "world encoding of {} bytes exceeds limit of {}", len, max)
            }
            SerializationError::RoundTripMismatch => {
                write!(f, "re-decoded world does not match the encoded one")
            }
        }
    }
}

impl std::error::Error for SerializationError {}
