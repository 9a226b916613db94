//! Fixed-width bit packing into 64-bit words.
//!
//! Values are laid out least-significant bit first. A value that does not fit
//! in what is left of the current word is split: its low bits fill the top of
//! that word and its high bits start the next one.

/// Number of words needed for `count` values of `width` bits.
pub const fn packed_len(count: usize, width: u32) -> usize {
    (count * width as usize).div_ceil(64)
}

const fn mask(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1 << width) - 1 }
}

/// Pack `values` at `width` bits each. Bits above `width` are discarded.
///
/// # Panics
///
/// If `width` is not in `1..=64`.
pub fn pack(values: &[u64], width: u32) -> Vec<u64> {
    assert!((1..=64).contains(&width), "bit width {width} out of range");
    let mask = mask(width);

    let mut words = Vec::with_capacity(packed_len(values.len(), width));
    let mut word = 0u64;
    let mut cursor = 0u32;

    for &value in values {
        let value = value & mask;
        word |= value << cursor;

        if cursor + width >= 64 {
            words.push(word);
            let spill = cursor + width - 64;
            word = if spill > 0 { value >> (width - spill) } else { 0 };
            cursor = spill;
        } else {
            cursor += width;
        }
    }

    if cursor > 0 {
        words.push(word);
    }
    words
}

/// Inverse of [`pack`]. `None` if `words` is too short for `count` values.
pub fn unpack(words: &[u64], width: u32, count: usize) -> Option<Vec<u64>> {
    if !(1..=64).contains(&width) || words.len() < packed_len(count, width) {
        return None;
    }
    let mask = mask(width);

    let values = (0..count)
        .map(|i| {
            let bit = i * width as usize;
            let (index, offset) = (bit / 64, (bit % 64) as u32);
            let mut value = words[index] >> offset;
            if offset + width > 64 {
                value |= words[index + 1] << (64 - offset);
            }
            value & mask
        })
        .collect();
    Some(values)
}
