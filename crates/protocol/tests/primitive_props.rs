//! Round-trip properties for the primitive codecs over their whole domains.

use bytes::BytesMut;
use proptest::prelude::*;
use slab_protocol::frame::{FrameBuffer, split_frames};
use slab_protocol::primitive::{
    PacketReader, decode_varint, decode_varlong, varint_len, varlong_len, write_string,
    write_varint, write_varlong,
};

proptest! {
    #[test]
    fn varint_round_trips(value in any::<i32>()) {
        let mut buf = BytesMut::new();
        let written = write_varint(&mut buf, value);
        prop_assert_eq!(written, buf.len());
        prop_assert_eq!(written, varint_len(value));
        prop_assert!(written <= 5);
        prop_assert_eq!(decode_varint(&buf, 0).unwrap(), (value, written));
    }

    #[test]
    fn varlong_round_trips(value in any::<i64>()) {
        let mut buf = BytesMut::new();
        let written = write_varlong(&mut buf, value);
        prop_assert_eq!(written, varlong_len(value));
        prop_assert!(written <= 10);
        prop_assert_eq!(decode_varlong(&buf, 0).unwrap(), (value, written));
    }

    #[test]
    fn string_round_trips(s in "\\PC{0,200}") {
        let mut buf = BytesMut::new();
        write_string(&mut buf, &s);
        let mut reader = PacketReader::new(&buf);
        prop_assert_eq!(reader.read_string().unwrap(), s);
        prop_assert_eq!(reader.remaining(), 0);
    }

    /// However a stream of frames is chopped up in transit, the buffer
    /// yields the same frames as splitting the whole batch at once.
    #[test]
    fn frame_buffer_is_split_invariant(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..8),
        cut in 1usize..64,
    ) {
        let mut stream = Vec::new();
        for payload in &payloads {
            write_varint(&mut stream, payload.len() as i32);
            stream.extend_from_slice(payload);
        }

        let expected = split_frames(&stream).unwrap();
        prop_assert_eq!(expected.len(), payloads.len());

        let mut buffer = FrameBuffer::new();
        let mut frames = Vec::new();
        for chunk in stream.chunks(cut) {
            frames.extend(buffer.push(chunk).unwrap());
        }
        prop_assert_eq!(frames, expected);
        prop_assert_eq!(buffer.pending(), 0);
    }
}
