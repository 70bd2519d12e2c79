//! Error types for the RDM domain layer

/// Errors raised by the device property store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("Property not found: {0}")]
    Missing(String),

    #[error("Property {name} has an unexpected type: {reason}")]
    WrongType { name: String, reason: String },
}

/// Result type alias for property store operations
pub type PropertyResult<T> = Result<T, PropertyError>;

/// Errors raised while parsing addressing types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UidParseError {
    #[error("UID must be of the form mmmm:dddddddd, got '{0}'")]
    Malformed(String),

    #[error("Invalid hex in UID '{0}'")]
    InvalidHex(String),
}
