//! Protocol error types.

use std::io;

use thiserror::Error;

use crate::types::{ConnectionState, Direction, FieldType};

/// Errors raised while reading, writing or framing protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// More than 5 bytes, or the input ended mid-value.
    #[error("malformed VarInt")]
    MalformedVarInt,

    /// More than 10 bytes, or the input ended mid-value.
    #[error("malformed VarLong")]
    MalformedVarLong,

    #[error("unexpected end of input: needed {needed} bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid boolean byte 0x{0:02x}")]
    InvalidBoolean(u8),

    #[error("negative length prefix {0}")]
    NegativeLength(i32),

    #[error("string too long: {len} bytes (max {max})")]
    StringTooLong { len: usize, max: usize },

    /// A frame declared more bytes than the batch holds.
    #[error("truncated frame: declared {declared} bytes, {available} available")]
    TruncatedFrame { declared: usize, available: usize },

    #[error("frame too long: {len} bytes (max {max})")]
    FrameTooLong { len: usize, max: usize },

    #[error("no {direction:?} packet named {name:?}")]
    UnknownPacketName { direction: Direction, name: String },

    #[error("packet {name} belongs to {expected:?}, not {actual:?}")]
    StateMismatch {
        name: String,
        expected: ConnectionState,
        actual: ConnectionState,
    },

    #[error("packet {name} takes {expected} fields, got {actual}")]
    FieldCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("field {index} of {name} must be {expected:?}")]
    FieldTypeMismatch {
        name: String,
        index: usize,
        expected: FieldType,
    },

    #[error("packet {0} has a generated payload and cannot be encoded from fields")]
    GeneratedPayload(String),

    #[error("packet {0} has a field schema and cannot take a generated payload")]
    NotGenerated(String),

    #[error("failed to decode field {index} ({field:?}) of {packet}: {source}")]
    FieldDecode {
        packet: String,
        index: usize,
        field: FieldType,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("{remaining} unread bytes left after decoding {packet}")]
    LeftoverBytes { packet: String, remaining: usize },
}

impl ProtocolError {
    /// Schema and payload disagree for a packet that was otherwise identified.
    pub fn is_field_decode(&self) -> bool {
        matches!(self, Self::FieldDecode { .. } | Self::LeftoverBytes { .. })
    }

    /// Raised by the encode side; indicates a bug or a bad registry table.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPacketName { .. }
                | Self::StateMismatch { .. }
                | Self::FieldCount { .. }
                | Self::FieldTypeMismatch { .. }
                | Self::GeneratedPayload(_)
                | Self::NotGenerated(_)
        )
    }
}

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;
