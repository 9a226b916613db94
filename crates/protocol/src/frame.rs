//! Frame splitting.
//!
//! Every frame on the wire is `[VarInt length][length bytes]`; the length
//! covers the packet id and payload but not itself.
//!
//! [`split_frames`] handles a buffer that is known to end on a frame
//! boundary. [`FrameBuffer`] is what the connection loop uses: TCP gives no
//! such guarantee, so it keeps an incomplete tail around until the rest of the
//! frame arrives.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::primitive::{CONTINUE_BIT, MAX_VARINT_LEN, decode_varint};

/// Maximum frame size (2 MiB, same as vanilla).
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// One length-delimited unit of protocol data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Declared length; always equal to `payload.len()`.
    pub length: usize,
    /// Packet id followed by the packet body.
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(payload: Bytes) -> Self {
        Self {
            length: payload.len(),
            payload,
        }
    }
}

/// Parse a length prefix at the start of `buf`.
///
/// `Ok(None)` means the prefix itself is not complete yet.
fn peek_length(buf: &[u8]) -> Result<Option<(usize, usize)>> {
    let terminated = buf
        .iter()
        .take(MAX_VARINT_LEN)
        .any(|b| b & CONTINUE_BIT == 0);
    if !terminated {
        if buf.len() >= MAX_VARINT_LEN {
            return Err(ProtocolError::MalformedVarInt);
        }
        return Ok(None);
    }

    let (length, prefix_len) = decode_varint(buf, 0)?;
    let length = usize::try_from(length).map_err(|_| ProtocolError::NegativeLength(length))?;
    if length > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLong {
            len: length,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(Some((length, prefix_len)))
}

/// Split a batch that ends exactly on a frame boundary into its frames, in
/// arrival order.
///
/// # Errors
///
/// - [`ProtocolError::TruncatedFrame`] if a declared length runs past the end
///   of `buf`
/// - [`ProtocolError::MalformedVarInt`] for a broken length prefix
/// - [`ProtocolError::FrameTooLong`] / [`ProtocolError::NegativeLength`] for
///   an unacceptable length
pub fn split_frames(buf: &[u8]) -> Result<Vec<RawFrame>> {
    let mut frames = Vec::new();
    let mut cursor = 0;

    while cursor < buf.len() {
        let rest = &buf[cursor..];
        let Some((length, prefix_len)) = peek_length(rest)? else {
            return Err(ProtocolError::MalformedVarInt);
        };

        let available = rest.len() - prefix_len;
        if length > available {
            return Err(ProtocolError::TruncatedFrame {
                declared: length,
                available,
            });
        }

        let start = prefix_len;
        frames.push(RawFrame::new(Bytes::copy_from_slice(
            &rest[start..start + length],
        )));
        cursor += prefix_len + length;
    }

    Ok(frames)
}

/// Accumulates transport reads and hands out complete frames only.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// The buffer transport reads should be appended to.
    pub fn read_buf(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Bytes waiting for the rest of their frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append a delivery and return every frame it completed.
    ///
    /// # Errors
    ///
    /// Any error leaves the stream undelimited; the caller must drop the
    /// connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<RawFrame>> {
        self.buffer.extend_from_slice(data);
        self.drain()
    }

    /// Extract every complete frame already in the buffer.
    pub fn drain(&mut self) -> Result<Vec<RawFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<RawFrame>> {
        let Some((length, prefix_len)) = peek_length(&self.buffer)? else {
            return Ok(None);
        };
        if self.buffer.len() < prefix_len + length {
            return Ok(None);
        }

        self.buffer.advance(prefix_len);
        let payload = self.buffer.split_to(length).freeze();
        Ok(Some(RawFrame::new(payload)))
    }
}
