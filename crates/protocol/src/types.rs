//! Core protocol vocabulary: directions, connection states, field types and
//! decoded field values.

use bytes::Bytes;
use serde::Deserialize;

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client -> server.
    ServerBound,
    /// Server -> client.
    ClientBound,
}

/// The protocol phase of a connection. Determines which packet ids are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

/// Wire type of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum FieldType {
    VarInt,
    VarLong,
    String,
    /// Namespaced resource key (`minecraft:brand`). Encoded exactly like `String`.
    Identifier,
    UnsignedShort,
    UnsignedByte,
    Byte,
    Boolean,
    Long,
    Int,
    Double,
    Float,
    /// Every byte left in the payload. Only valid as the last field.
    ByteArray,
}

/// One decoded field. The variant always matches the [`FieldType`] that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    VarInt(i32),
    VarLong(i64),
    String(String),
    Identifier(String),
    UnsignedShort(u16),
    UnsignedByte(u8),
    Byte(i8),
    Boolean(bool),
    Long(i64),
    Int(i32),
    Double(f64),
    Float(f32),
    ByteArray(Bytes),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::VarInt(_) => FieldType::VarInt,
            Self::VarLong(_) => FieldType::VarLong,
            Self::String(_) => FieldType::String,
            Self::Identifier(_) => FieldType::Identifier,
            Self::UnsignedShort(_) => FieldType::UnsignedShort,
            Self::UnsignedByte(_) => FieldType::UnsignedByte,
            Self::Byte(_) => FieldType::Byte,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Long(_) => FieldType::Long,
            Self::Int(_) => FieldType::Int,
            Self::Double(_) => FieldType::Double,
            Self::Float(_) => FieldType::Float,
            Self::ByteArray(_) => FieldType::ByteArray,
        }
    }

    /// Any 32-bit-or-narrower integer, widened.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::VarInt(v) | Self::Int(v) => Some(v),
            Self::UnsignedShort(v) => Some(i32::from(v)),
            Self::UnsignedByte(v) => Some(i32::from(v)),
            Self::Byte(v) => Some(i32::from(v)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::VarLong(v) | Self::Long(v) => Some(v),
            _ => self.as_i32().map(i64::from),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Identifier(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }
}
