//! Registry-driven packet codec.
//!
//! Decoding reads the packet id from a [`RawFrame`], looks the schema up in
//! the [`PacketRegistry`] and walks it field by field. Encoding does the
//! reverse and produces a complete `[length][id][body]` frame.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::frame::RawFrame;
use crate::primitive::{PacketReader, varint_len, write_field, write_varint};
use crate::registry::{PacketDescriptor, PacketRegistry};
use crate::types::{ConnectionState, Direction, FieldValue};

/// A packet body produced by code rather than from a field list.
pub trait PayloadSource {
    /// Append the packet body (everything after the packet id).
    fn write_payload(&self, buf: &mut BytesMut);
}

/// A successfully identified and decoded packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket<'r> {
    pub descriptor: &'r PacketDescriptor,
    /// Positionally aligned with `descriptor.fields`. A generated packet
    /// yields its whole body as a single `ByteArray`.
    pub fields: Vec<FieldValue>,
}

impl DecodedPacket<'_> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn field(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index)
    }
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<'r> {
    Packet(DecodedPacket<'r>),
    /// No registry entry for this id in the current direction and state.
    Unknown { id: i32 },
}

/// Encoder/decoder bound to one registry.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    registry: Arc<PacketRegistry>,
}

impl PacketCodec {
    pub fn new(registry: Arc<PacketRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    /// Decode one frame received in `state`, travelling `direction`.
    ///
    /// An id the registry does not know is not an error; it comes back as
    /// [`Decoded::Unknown`].
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MalformedVarInt`] if the packet id cannot be read
    /// - [`ProtocolError::FieldDecode`] if a field cannot be read
    /// - [`ProtocolError::LeftoverBytes`] if bytes remain after the schema
    pub fn decode(
        &self,
        frame: &RawFrame,
        direction: Direction,
        state: ConnectionState,
    ) -> Result<Decoded<'_>> {
        let mut reader = PacketReader::new(&frame.payload);
        let id = reader.read_varint()?;

        let Some(descriptor) = self.registry.resolve(direction, state, id) else {
            return Ok(Decoded::Unknown { id });
        };

        if descriptor.generated {
            let body = reader.read_remaining();
            return Ok(Decoded::Packet(DecodedPacket {
                descriptor,
                fields: vec![FieldValue::ByteArray(body)],
            }));
        }

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for (index, &field) in descriptor.fields.iter().enumerate() {
            let value = reader
                .read_field(field)
                .map_err(|source| ProtocolError::FieldDecode {
                    packet: descriptor.name.clone(),
                    index,
                    field,
                    source: Box::new(source),
                })?;
            fields.push(value);
        }

        if reader.remaining() > 0 {
            return Err(ProtocolError::LeftoverBytes {
                packet: descriptor.name.clone(),
                remaining: reader.remaining(),
            });
        }

        Ok(Decoded::Packet(DecodedPacket { descriptor, fields }))
    }

    fn lookup(
        &self,
        direction: Direction,
        state: ConnectionState,
        name: &str,
    ) -> Result<&PacketDescriptor> {
        let descriptor = self.registry.resolve_name(direction, name).ok_or_else(|| {
            ProtocolError::UnknownPacketName {
                direction,
                name: name.to_owned(),
            }
        })?;

        if descriptor.state != state {
            return Err(ProtocolError::StateMismatch {
                name: name.to_owned(),
                expected: descriptor.state,
                actual: state,
            });
        }
        Ok(descriptor)
    }

    /// Encode a packet from its field values into a complete frame.
    ///
    /// # Errors
    ///
    /// Every error here is a programming or configuration error: an unknown
    /// name, a packet from another state, a wrong field count or type, or a
    /// packet whose body must come from [`PacketCodec::encode_with`].
    pub fn encode(
        &self,
        direction: Direction,
        state: ConnectionState,
        name: &str,
        fields: &[FieldValue],
    ) -> Result<Bytes> {
        let descriptor = self.lookup(direction, state, name)?;
        if descriptor.generated {
            return Err(ProtocolError::GeneratedPayload(name.to_owned()));
        }
        if descriptor.fields.len() != fields.len() {
            return Err(ProtocolError::FieldCount {
                name: name.to_owned(),
                expected: descriptor.fields.len(),
                actual: fields.len(),
            });
        }

        let mut body = BytesMut::new();
        for (index, (expected, value)) in descriptor.fields.iter().zip(fields).enumerate() {
            if value.field_type() != *expected {
                return Err(ProtocolError::FieldTypeMismatch {
                    name: name.to_owned(),
                    index,
                    expected: *expected,
                });
            }
            write_field(&mut body, value);
        }

        Ok(frame(descriptor.id, &body))
    }

    /// Encode a packet whose body is written by `source` (chunk data).
    ///
    /// # Errors
    ///
    /// Unknown name or wrong state, as for [`PacketCodec::encode`], or
    /// [`ProtocolError::NotGenerated`] for a packet with a field schema.
    pub fn encode_with(
        &self,
        direction: Direction,
        state: ConnectionState,
        name: &str,
        source: &impl PayloadSource,
    ) -> Result<Bytes> {
        let descriptor = self.lookup(direction, state, name)?;
        if !descriptor.generated {
            return Err(ProtocolError::NotGenerated(name.to_owned()));
        }
        let mut body = BytesMut::new();
        source.write_payload(&mut body);
        Ok(frame(descriptor.id, &body))
    }
}

/// `VarInt(len(id) + len(body)) || VarInt(id) || body`
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn frame(id: i32, body: &[u8]) -> Bytes {
    let inner_len = varint_len(id) + body.len();
    let mut out = BytesMut::with_capacity(varint_len(inner_len as i32) + inner_len);
    write_varint(&mut out, inner_len as i32);
    write_varint(&mut out, id);
    out.put_slice(body);
    out.freeze()
}
