/// Global-palette block state: `block_id << 4 | metadata`.
///
/// The encoder stores these without interpreting them; the only thing it
/// checks is that a state fits the configured bits per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockState(pub u64);

impl BlockState {
    pub const AIR: BlockState = BlockState(0);
    pub const STONE: BlockState = BlockState::from_id(1, 0);

    pub const fn from_id(id: u16, meta: u8) -> Self {
        Self(((id as u64) << 4) | (meta as u64 & 0xF))
    }

    /// Smallest bit width able to hold this state.
    pub const fn bits_needed(&self) -> u32 {
        u64::BITS - self.0.leading_zeros()
    }
}
