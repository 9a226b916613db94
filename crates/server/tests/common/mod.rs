#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use slab_protocol::{
    ConnectionState, Decoded, Direction, FieldValue, PacketCodec, RawFrame, split_frames,
};
use slab_server::transport::Outbound;
use slab_server::{ServerConfig, ServerContext};
use tokio::sync::mpsc;

pub fn context(config: ServerConfig) -> Arc<ServerContext> {
    Arc::new(ServerContext::with_default_registry(config).unwrap())
}

/// A frame as the client would send it.
pub fn client_frame(
    codec: &PacketCodec,
    state: ConnectionState,
    name: &str,
    fields: &[FieldValue],
) -> RawFrame {
    let bytes = codec
        .encode(Direction::ServerBound, state, name, fields)
        .unwrap();
    split_frames(&bytes).unwrap().remove(0)
}

pub fn handshake(codec: &PacketCodec, next_state: i32) -> RawFrame {
    client_frame(
        codec,
        ConnectionState::Handshaking,
        "Handshake",
        &[
            FieldValue::VarInt(340),
            FieldValue::String("localhost".into()),
            FieldValue::UnsignedShort(25565),
            FieldValue::VarInt(next_state),
        ],
    )
}

/// Everything queued so far, without waiting.
pub fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

/// Decode a server frame, given the state the client believes it is in.
pub fn decode_sent(
    codec: &PacketCodec,
    bytes: &Bytes,
    state: ConnectionState,
) -> (String, Vec<FieldValue>) {
    let mut frames = split_frames(bytes).unwrap();
    assert_eq!(frames.len(), 1, "one frame per outbound message");
    let frame = frames.remove(0);
    match codec.decode(&frame, Direction::ClientBound, state).unwrap() {
        Decoded::Packet(packet) => (packet.name().to_owned(), packet.fields),
        Decoded::Unknown { id } => panic!("server sent unknown packet 0x{id:02x}"),
    }
}

pub fn frame_bytes(message: &Outbound) -> &Bytes {
    match message {
        Outbound::Frame(bytes) => bytes,
        Outbound::Close => panic!("expected a frame, got Close"),
    }
}
