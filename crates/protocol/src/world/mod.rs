//! World generation for the wire: block states, column positions, bit
//! packing and the chunk column encoder.

pub mod block;
pub mod chunk;
pub mod packing;
pub mod position;

pub use block::BlockState;
pub use chunk::{ChunkColumn, ChunkConfig, ChunkEncoder, ChunkError, ChunkSection, PackedSection};
pub use position::ChunkPos;
