//! Error types for the detection link

use std::fmt;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Semantic name of a record field, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    X,
    Z,
    Y,
    Width,
    Length,
    Height,
    Pivot,
    Id,
    Confidence,
}

impl Field {
    /// All fields in the order they appear on the wire
    pub const WIRE_ORDER: [Field; 9] = [
        Field::X,
        Field::Z,
        Field::Y,
        Field::Width,
        Field::Length,
        Field::Height,
        Field::Pivot,
        Field::Id,
        Field::Confidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::X => "x",
            Field::Z => "z",
            Field::Y => "y",
            Field::Width => "width",
            Field::Length => "length",
            Field::Height => "height",
            Field::Pivot => "pivot",
            Field::Id => "id",
            Field::Confidence => "confidence",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The record ended before this field
    Missing,
    /// The token is not a number of the expected type
    Malformed,
    /// The token parsed but is NaN or infinite
    NonFinite,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecodeErrorKind::Missing => "Missing",
            DecodeErrorKind::Malformed => "Invalid",
            DecodeErrorKind::NonFinite => "Non-finite",
        })
    }
}

/// A single record could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} {field} value: {raw:?}")]
pub struct DecodeError {
    pub field: Field,
    pub raw: String,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn missing(field: Field) -> Self {
        Self {
            field,
            raw: String::new(),
            kind: DecodeErrorKind::Missing,
        }
    }

    pub fn malformed(field: Field, raw: &str) -> Self {
        Self {
            field,
            raw: raw.to_string(),
            kind: DecodeErrorKind::Malformed,
        }
    }

    pub fn non_finite(field: Field, raw: &str) -> Self {
        Self {
            field,
            raw: raw.to_string(),
            kind: DecodeErrorKind::NonFinite,
        }
    }
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed on port {port}: {reason}")]
    BindFailed { port: u16, reason: String },

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to spawn receive thread: {0}")]
    ThreadSpawn(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
