/// Widest square [`ChunkPos::around_origin`] will produce (64x64 columns).
pub const MAX_RADIUS: u32 = 32;

/// Chunk column position (each column is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Columns covering a `2 * radius` square centred on the block origin,
    /// x-major. A radius of 1 is the 2x2 set `{-1, 0} x {-1, 0}`. The radius
    /// is clamped to [`MAX_RADIUS`].
    #[allow(clippy::cast_possible_wrap)]
    pub fn around_origin(radius: u32) -> Vec<ChunkPos> {
        let radius = radius.min(MAX_RADIUS);
        let r = radius as i32;
        let mut positions = Vec::with_capacity((2 * radius as usize).pow(2));
        for x in -r..r {
            for z in -r..r {
                positions.push(ChunkPos::new(x, z));
            }
        }
        positions
    }

    /// The column containing the given block coordinates.
    pub fn containing(x: f64, z: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let to_chunk = |v: f64| (v.floor() as i32) >> 4;
        Self::new(to_chunk(x), to_chunk(z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_one_is_the_four_columns_around_origin() {
        assert_eq!(
            ChunkPos::around_origin(1),
            vec![
                ChunkPos::new(-1, -1),
                ChunkPos::new(-1, 0),
                ChunkPos::new(0, -1),
                ChunkPos::new(0, 0),
            ]
        );
    }

    #[test]
    fn radius_zero_is_empty() {
        assert!(ChunkPos::around_origin(0).is_empty());
        assert_eq!(ChunkPos::around_origin(2).len(), 16);
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(ChunkPos::around_origin(u32::MAX).len(), (2 * MAX_RADIUS as usize).pow(2));
    }

    #[test]
    fn negative_blocks_round_down() {
        assert_eq!(ChunkPos::containing(-0.5, 15.9), ChunkPos::new(-1, 0));
        assert_eq!(ChunkPos::containing(16.0, -16.0), ChunkPos::new(1, -1));
    }
}
