//! Error types for the xmlstream library

use thiserror::Error;

/// Result type alias for xmlstream operations
pub type Result<T> = std::result::Result<T, XmlError>;

/// Main error type for all streaming XML operations
#[derive(Error, Debug)]
pub enum XmlError {
    /// Operation not allowed in the writer's current state
    #[error("Invalid writer state: {0}")]
    InvalidState(String),

    /// Text finalize requested while a background encoder owns the output
    #[error("Cannot read xml as text while an encoder is attached; finalize to bytes instead")]
    EncoderAttached,

    /// Failure inside the encoding context (worker gone, channel closed, ...)
    #[error("Encoder failed: {0}")]
    Encoder(String),

    /// Byte buffer would grow past its hard ceiling
    #[error("Encoded output of {requested} bytes exceeds the {limit} byte limit")]
    CapacityExceeded { requested: usize, limit: usize },

    /// Malformed markup handed to the event source
    #[error("Failed to parse XML: {0}")]
    Parse(String),

    /// Non UTF-8 bytes in parsed markup
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        XmlError::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        XmlError::Parse(err.to_string())
    }
}
