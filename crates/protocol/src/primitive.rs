//! Primitive wire codecs: `VarInt`/`VarLong`, big-endian fixed-width numbers,
//! booleans and length-prefixed UTF-8 strings.
//!
//! Variable-length integers carry 7 bits per byte, least-significant group
//! first, with the high bit set on every byte except the last.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{ProtocolError, Result};
use crate::types::{FieldType, FieldValue};

/// Segment bits mask (lower 7 bits).
const SEGMENT_BITS: u8 = 0x7F;

/// Continue bit (high bit).
pub const CONTINUE_BIT: u8 = 0x80;

pub const MAX_VARINT_LEN: usize = 5;
pub const MAX_VARLONG_LEN: usize = 10;

/// Longest string body accepted: 32767 UTF-16 units at up to 4 bytes each.
pub const MAX_STRING_BYTES: usize = 32767 * 4;

/// Decode a `VarInt` starting at `offset`.
///
/// Returns the value and the number of bytes it occupied.
///
/// # Errors
///
/// [`ProtocolError::MalformedVarInt`] if the value runs past 5 bytes or the
/// input ends before the final byte.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(i32, usize)> {
    let mut value: u32 = 0;

    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = buf.get(offset + i) else {
            return Err(ProtocolError::MalformedVarInt);
        };
        value |= u32::from(byte & SEGMENT_BITS) << (7 * i);

        if byte & CONTINUE_BIT == 0 {
            #[allow(clippy::cast_possible_wrap)]
            return Ok((value as i32, i + 1));
        }
    }

    Err(ProtocolError::MalformedVarInt)
}

/// Decode a `VarLong` starting at `offset`. Mirrors [`decode_varint`].
///
/// # Errors
///
/// [`ProtocolError::MalformedVarLong`] past 10 bytes or on truncated input.
pub fn decode_varlong(buf: &[u8], offset: usize) -> Result<(i64, usize)> {
    let mut value: u64 = 0;

    for i in 0..MAX_VARLONG_LEN {
        let Some(&byte) = buf.get(offset + i) else {
            return Err(ProtocolError::MalformedVarLong);
        };
        value |= u64::from(byte & SEGMENT_BITS) << (7 * i);

        if byte & CONTINUE_BIT == 0 {
            #[allow(clippy::cast_possible_wrap)]
            return Ok((value as i64, i + 1));
        }
    }

    Err(ProtocolError::MalformedVarLong)
}

/// Write a `VarInt`. Negative values are written as their unsigned 32-bit
/// pattern and always take 5 bytes.
///
/// Returns the number of bytes written.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn write_varint(buf: &mut impl BufMut, value: i32) -> usize {
    let mut value = value as u32;
    let mut written = 0;

    loop {
        let mut byte = (value & u32::from(SEGMENT_BITS)) as u8;
        value >>= 7;
        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);
        written += 1;

        if value == 0 {
            return written;
        }
    }
}

/// Write a `VarLong`. Returns the number of bytes written.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn write_varlong(buf: &mut impl BufMut, value: i64) -> usize {
    let mut value = value as u64;
    let mut written = 0;

    loop {
        let mut byte = (value & u64::from(SEGMENT_BITS)) as u8;
        value >>= 7;
        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);
        written += 1;

        if value == 0 {
            return written;
        }
    }
}

/// Calculate the number of bytes needed to encode a `VarInt`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varint_len(value: i32) -> usize {
    let value = value as u32;
    if value == 0 {
        return 1;
    }
    let bits_needed = 32 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

/// Calculate the number of bytes needed to encode a `VarLong`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varlong_len(value: i64) -> usize {
    let value = value as u64;
    if value == 0 {
        return 1;
    }
    let bits_needed = 64 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

/// Write a length-prefixed UTF-8 string. The prefix counts bytes, not chars.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    let bytes = s.as_bytes();
    write_varint(buf, bytes.len() as i32);
    buf.put_slice(bytes);
}

/// Write one field value in its wire form.
pub fn write_field(buf: &mut impl BufMut, value: &FieldValue) {
    match value {
        FieldValue::VarInt(v) => {
            write_varint(buf, *v);
        }
        FieldValue::VarLong(v) => {
            write_varlong(buf, *v);
        }
        FieldValue::String(s) | FieldValue::Identifier(s) => write_string(buf, s),
        FieldValue::UnsignedShort(v) => buf.put_u16(*v),
        FieldValue::UnsignedByte(v) => buf.put_u8(*v),
        FieldValue::Byte(v) => buf.put_i8(*v),
        FieldValue::Boolean(v) => buf.put_u8(u8::from(*v)),
        FieldValue::Long(v) => buf.put_i64(*v),
        FieldValue::Int(v) => buf.put_i32(*v),
        FieldValue::Double(v) => buf.put_f64(*v),
        FieldValue::Float(v) => buf.put_f32(*v),
        FieldValue::ByteArray(b) => buf.put_slice(b),
    }
}

/// Bounds-checked cursor over one packet payload.
///
/// Every `read_*` fails with [`ProtocolError::UnexpectedEof`] instead of
/// panicking when the payload is too short.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            len: buf.len(),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.len() < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        let (value, len) = decode_varint(self.buf, 0)?;
        self.buf.advance(len);
        Ok(value)
    }

    pub fn read_varlong(&mut self) -> Result<i64> {
        let (value, len) = decode_varlong(self.buf, 0)?;
        self.buf.advance(len);
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    /// Strict: only `0x00` and `0x01` are accepted.
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            other => Err(ProtocolError::InvalidBoolean(other)),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        if len > MAX_STRING_BYTES {
            return Err(ProtocolError::StringTooLong {
                len,
                max: MAX_STRING_BYTES,
            });
        }
        self.ensure(len)?;

        let s = std::str::from_utf8(&self.buf[..len])?.to_owned();
        self.buf.advance(len);
        Ok(s)
    }

    /// Take every remaining byte.
    pub fn read_remaining(&mut self) -> Bytes {
        let rest = Bytes::copy_from_slice(self.buf);
        self.buf.advance(self.buf.len());
        rest
    }

    /// Read one value of the given wire type.
    pub fn read_field(&mut self, field: FieldType) -> Result<FieldValue> {
        Ok(match field {
            FieldType::VarInt => FieldValue::VarInt(self.read_varint()?),
            FieldType::VarLong => FieldValue::VarLong(self.read_varlong()?),
            FieldType::String => FieldValue::String(self.read_string()?),
            FieldType::Identifier => FieldValue::Identifier(self.read_string()?),
            FieldType::UnsignedShort => FieldValue::UnsignedShort(self.read_u16()?),
            FieldType::UnsignedByte => FieldValue::UnsignedByte(self.read_u8()?),
            FieldType::Byte => FieldValue::Byte(self.read_i8()?),
            FieldType::Boolean => FieldValue::Boolean(self.read_bool()?),
            FieldType::Long => FieldValue::Long(self.read_i64()?),
            FieldType::Int => FieldValue::Int(self.read_i32()?),
            FieldType::Double => FieldValue::Double(self.read_f64()?),
            FieldType::Float => FieldValue::Float(self.read_f32()?),
            FieldType::ByteArray => FieldValue::ByteArray(self.read_remaining()),
        })
    }
}
