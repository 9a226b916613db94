//! Flat-world chunk columns in the protocol 340 `ChunkData` layout.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

use super::block::BlockState;
use super::packing::pack;
use super::position::ChunkPos;
use crate::codec::PayloadSource;
use crate::primitive::{varint_len, write_varint};

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
/// One nibble per block.
pub const LIGHT_BYTES: usize = SECTION_VOLUME / 2;
/// Sections in a full-height column.
pub const MAX_SECTIONS: u8 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("bits per block must be within 1..=64, got {0}")]
    InvalidBitsPerBlock(u8),

    #[error("block state {state} does not fit in {bits} bits")]
    BlockStateTooWide { state: u64, bits: u8 },

    #[error("a column holds 1..=16 sections, got {0}")]
    InvalidSectionCount(u8),
}

/// What the generated world is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub bits_per_block: u8,
    pub block_state: BlockState,
    /// Filled sections, from the bottom of the column.
    pub sections: u8,
    /// Value of every block-light and sky-light byte.
    pub light: u8,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            bits_per_block: 14,
            block_state: BlockState::STONE,
            sections: 4,
            light: 0xFF,
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ChunkError> {
        if !(1..=64).contains(&self.bits_per_block) {
            return Err(ChunkError::InvalidBitsPerBlock(self.bits_per_block));
        }
        if self.block_state.bits_needed() > u32::from(self.bits_per_block) {
            return Err(ChunkError::BlockStateTooWide {
                state: self.block_state.0,
                bits: self.bits_per_block,
            });
        }
        if !(1..=MAX_SECTIONS).contains(&self.sections) {
            return Err(ChunkError::InvalidSectionCount(self.sections));
        }
        Ok(())
    }
}

/// A 16x16x16 cube of blocks, stored in YZX order (the wire order).
#[derive(Clone)]
pub struct ChunkSection {
    blocks: Box<[BlockState; SECTION_VOLUME]>,
}

impl ChunkSection {
    pub fn new_filled(block: BlockState) -> Self {
        Self {
            blocks: Box::new([block; SECTION_VOLUME]),
        }
    }

    #[inline]
    const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u8, y: u8, z: u8) -> BlockState {
        self.blocks[Self::index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: u8, y: u8, z: u8, block: BlockState) {
        self.blocks[Self::index(x, y, z)] = block;
    }

    /// Bit-pack the block states at `bits` per block, with uniform lighting.
    pub fn pack(&self, bits: u8, light: u8) -> PackedSection {
        let values: Vec<u64> = self.blocks.iter().map(|b| b.0).collect();
        PackedSection {
            bits_per_block: bits,
            words: pack(&values, u32::from(bits)),
            block_light: Box::new([light; LIGHT_BYTES]),
            sky_light: Box::new([light; LIGHT_BYTES]),
        }
    }
}

/// A section in its wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSection {
    pub bits_per_block: u8,
    pub words: Vec<u64>,
    pub block_light: Box<[u8; LIGHT_BYTES]>,
    pub sky_light: Box<[u8; LIGHT_BYTES]>,
}

impl PackedSection {
    /// Encoded size in bytes.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn wire_len(&self) -> usize {
        1 + varint_len(self.words.len() as i32) + self.words.len() * 8 + 2 * LIGHT_BYTES
    }

    /// Bits per block, word count, words as big-endian u64, block light, sky
    /// light.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u8(self.bits_per_block);
        write_varint(buf, self.words.len() as i32);
        for word in &self.words {
            buf.put_u64(*word);
        }
        buf.put_slice(&self.block_light[..]);
        buf.put_slice(&self.sky_light[..]);
    }
}

/// Builds chunk columns for a uniform world.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    config: ChunkConfig,
}

impl ChunkEncoder {
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// One freshly packed section filled with the configured block state.
    pub fn section(&self) -> PackedSection {
        ChunkSection::new_filled(self.config.block_state)
            .pack(self.config.bits_per_block, self.config.light)
    }

    /// A full column at `pos`; its sections are built for this call.
    pub fn column(&self, pos: ChunkPos) -> ChunkColumn {
        let sections: Vec<PackedSection> =
            (0..self.config.sections).map(|_| self.section()).collect();
        tracing::trace!(x = pos.x, z = pos.z, sections = sections.len(), "Chunk column built");
        ChunkColumn {
            pos,
            primary_bit_mask: (1 << self.config.sections) - 1,
            sections,
        }
    }
}

/// A full `ChunkData` body, ready to be framed.
#[derive(Debug, Clone)]
pub struct ChunkColumn {
    pub pos: ChunkPos,
    pub primary_bit_mask: i32,
    pub sections: Vec<PackedSection>,
}

impl ChunkColumn {
    /// Byte length of the section data.
    pub fn data_len(&self) -> usize {
        self.sections.iter().map(PackedSection::wire_len).sum()
    }
}

impl PayloadSource for ChunkColumn {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn write_payload(&self, buf: &mut BytesMut) {
        write_varint(buf, self.pos.x);
        write_varint(buf, self.pos.z);
        // Ground-up continuous.
        buf.put_u8(1);
        write_varint(buf, self.primary_bit_mask);
        write_varint(buf, self.data_len() as i32);
        for section in &self.sections {
            section.write(buf);
        }
        // Block entities.
        write_varint(buf, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::PacketReader;
    use crate::world::packing::unpack;

    #[test]
    fn default_config_is_valid() {
        let config = ChunkConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.block_state, BlockState(16));
    }

    #[test]
    fn rejects_bad_configs() {
        let bits = ChunkConfig { bits_per_block: 0, ..Default::default() };
        assert_eq!(bits.validate(), Err(ChunkError::InvalidBitsPerBlock(0)));

        let wide = ChunkConfig { bits_per_block: 4, ..Default::default() };
        assert_eq!(
            wide.validate(),
            Err(ChunkError::BlockStateTooWide { state: 16, bits: 4 })
        );

        let tall = ChunkConfig { sections: 17, ..Default::default() };
        assert_eq!(tall.validate(), Err(ChunkError::InvalidSectionCount(17)));
    }

    #[test]
    fn section_packs_to_896_words_at_14_bits() {
        let encoder = ChunkEncoder::new(ChunkConfig::default()).unwrap();
        let section = encoder.section();
        assert_eq!(section.bits_per_block, 14);
        assert_eq!(section.words.len(), 896);
        assert_eq!(
            unpack(&section.words, 14, SECTION_VOLUME).unwrap(),
            vec![16; SECTION_VOLUME]
        );
        assert!(section.sky_light.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn section_get_set_use_yzx_order() {
        let mut section = ChunkSection::new_filled(BlockState::AIR);
        section.set(1, 2, 3, BlockState::STONE);
        assert_eq!(section.get(1, 2, 3), BlockState::STONE);
        assert_eq!(section.get(3, 2, 1), BlockState::AIR);

        let packed = section.pack(5, 0);
        let values = unpack(&packed.words, 5, SECTION_VOLUME).unwrap();
        assert_eq!(values[2 * 256 + 3 * 16 + 1], 16);
    }

    #[test]
    fn section_wire_layout() {
        let section = ChunkSection::new_filled(BlockState::STONE).pack(14, 0xFF);
        let mut buf = BytesMut::new();
        section.write(&mut buf);
        assert_eq!(buf.len(), section.wire_len());
        assert_eq!(buf.len(), 1 + 2 + 896 * 8 + 2 * LIGHT_BYTES);
        assert_eq!(buf[0], 14);
        // 896 = 0x380 -> 80 07
        assert_eq!(&buf[1..3], &[0x80, 0x07]);
        assert!(buf[buf.len() - 2 * LIGHT_BYTES..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn column_payload_layout() {
        let encoder = ChunkEncoder::new(ChunkConfig::default()).unwrap();
        let column = encoder.column(ChunkPos::new(-1, 0));
        assert_eq!(column.primary_bit_mask, 0b1111);
        assert_eq!(column.sections.len(), 4);

        let mut buf = BytesMut::new();
        column.write_payload(&mut buf);

        let mut reader = PacketReader::new(&buf);
        assert_eq!(reader.read_varint().unwrap(), -1);
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_varint().unwrap(), 0b1111);
        let len = reader.read_varint().unwrap() as usize;
        assert_eq!(len, 4 * (1 + 2 + 896 * 8 + 2 * LIGHT_BYTES));
        assert_eq!(reader.remaining(), len + 1);
        assert_eq!(buf[buf.len() - 1], 0);
    }
}
