//! Error types for the rhai-osc crate.

use thiserror::Error;

/// Errors that can occur while marshaling arguments or parsing endpoint specs.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// An incoming argument uses an OSC wire type with no script representation.
    #[error("unsupported OSC wire type '{0}'")]
    UnsupportedWireType(char),

    /// A method signature names a wire type that cannot be marshaled
    /// (blob and timetag arguments are deliberately not representable).
    #[error("unsupported type signature character '{0}'")]
    UnsupportedSignatureChar(char),

    /// A method signature contains a character that is not an OSC type tag.
    #[error("invalid type signature character '{0}'")]
    InvalidSignatureChar(char),

    /// An endpoint spec is neither a bare port number nor a usable OSC URL.
    #[error("invalid endpoint spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
