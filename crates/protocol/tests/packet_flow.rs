//! Frames in, packets out: the codec driven through the frame splitter and a
//! registry table loaded from JSON.

use std::sync::Arc;

use bytes::BytesMut;
use slab_protocol::world::{ChunkConfig, ChunkEncoder, ChunkPos};
use slab_protocol::{
    ConnectionState, Decoded, Direction, FieldValue, PacketCodec, PacketRegistry, split_frames,
};

const TABLE: &str = r#"{
    "ServerBound": {
        "Handshake": { "id": 0, "state": "Handshaking",
                       "fields": ["VarInt", "String", "UnsignedShort", "VarInt"], "handler": 0 },
        "StatusRequest": { "id": 0, "state": "Status", "handler": 1 },
        "Ping": { "id": 1, "state": "Status", "fields": ["Long"], "handler": 2 }
    },
    "ClientBound": {
        "StatusResponse": { "id": 0, "state": "Status", "fields": ["String"] },
        "ChunkData": { "id": 32, "state": "Play", "generated": true }
    }
}"#;

fn codec() -> PacketCodec {
    PacketCodec::new(Arc::new(PacketRegistry::from_json(TABLE).unwrap()))
}

#[test]
fn status_batch_decodes_in_order() {
    // Handshake(340, "localhost", 25565, 1) + StatusRequest + Ping(42), as
    // a client sends them in one write.
    let batch: &[u8] = &[
        0x10, 0x00, 0xd4, 0x02, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x63,
        0xdd, 0x01, //
        0x01, 0x00, //
        0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 42,
    ];
    let frames = split_frames(batch).unwrap();
    assert_eq!(frames.len(), 3);

    let codec = codec();
    let states = [
        ConnectionState::Handshaking,
        ConnectionState::Status,
        ConnectionState::Status,
    ];
    let names: Vec<String> = frames
        .iter()
        .zip(states)
        .map(|(frame, state)| match codec.decode(frame, Direction::ServerBound, state).unwrap() {
            Decoded::Packet(p) => p.name().to_owned(),
            Decoded::Unknown { id } => panic!("unexpected unknown id {id}"),
        })
        .collect();
    assert_eq!(names, ["Handshake", "StatusRequest", "Ping"]);

    let Decoded::Packet(handshake) = codec
        .decode(&frames[0], Direction::ServerBound, ConnectionState::Handshaking)
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(handshake.fields[0], FieldValue::VarInt(340));
    assert_eq!(handshake.fields[1].as_str(), Some("localhost"));
    assert_eq!(handshake.fields[2], FieldValue::UnsignedShort(25565));
    assert_eq!(handshake.fields[3], FieldValue::VarInt(1));
}

#[test]
fn same_frame_means_different_packets_per_state() {
    let codec = codec();
    let frames = split_frames(&[0x01, 0x00]).unwrap();

    // Id 0 with an empty body is a StatusRequest in Status...
    assert!(matches!(
        codec.decode(&frames[0], Direction::ServerBound, ConnectionState::Status),
        Ok(Decoded::Packet(p)) if p.name() == "StatusRequest"
    ));
    // ...nothing at all in Login...
    assert_eq!(
        codec
            .decode(&frames[0], Direction::ServerBound, ConnectionState::Login)
            .unwrap(),
        Decoded::Unknown { id: 0 }
    );
    // ...and a Handshake with missing fields in Handshaking.
    assert!(
        codec
            .decode(&frames[0], Direction::ServerBound, ConnectionState::Handshaking)
            .unwrap_err()
            .is_field_decode()
    );
}

#[test]
fn chunk_data_frames_carry_the_generated_column() {
    let codec = codec();
    let encoder = ChunkEncoder::new(ChunkConfig::default()).unwrap();

    let mut stream = BytesMut::new();
    for pos in ChunkPos::around_origin(1) {
        let frame = codec
            .encode_with(
                Direction::ClientBound,
                ConnectionState::Play,
                "ChunkData",
                &encoder.column(pos),
            )
            .unwrap();
        stream.extend_from_slice(&frame);
    }

    let frames = split_frames(&stream).unwrap();
    assert_eq!(frames.len(), 4);
    for frame in &frames {
        let Decoded::Packet(packet) = codec
            .decode(frame, Direction::ClientBound, ConnectionState::Play)
            .unwrap()
        else {
            panic!("ChunkData should resolve");
        };
        assert_eq!(packet.name(), "ChunkData");
        let body = packet.fields[0].as_bytes().unwrap();
        // 4 sections of (1 + 2 + 896 * 8 + 4096) bytes plus the column header.
        assert!(body.len() > 4 * (1 + 2 + 896 * 8 + 4096));
    }
}
