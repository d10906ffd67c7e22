
use crate::error::Error;

/// Returns the padding required to make the length a multiple of 4
pub(crate) fn get_padding_size(len: usize) -> usize {
    if len % 4 == 0 {
        0
    } else {
        4 - (len % 4)
    }
}

/// Zero-fills `buf` from `offset` up to the next 32-bit boundary.
pub(crate) fn put_zero_padding(buf: &mut [u8], offset: usize) -> usize {
    let padding_size = get_padding_size(offset);
    for b in buf.iter_mut().take(padding_size) {
        *b = 0;
    }
    padding_size
}

/// Left-shifts `src` by `n` and appends the low `n` bits of `val`, 1 <= n <= 32.
pub(crate) fn append_nbits_to_uint32(src: u32, n: u32, val: u32) -> u32 {
    debug_assert!((1..=32).contains(&n));
    src.checked_shl(n).unwrap_or(0) | (val & (u32::MAX >> (32 - n)))
}

/// Returns the `n` bits of `b` starting at bit `begin`, where bit 0 is the
/// most significant one.
pub(crate) fn get_nbits_from_byte(b: u8, begin: u16, n: u16) -> u16 {
    debug_assert!(n >= 1 && begin + n <= 8);
    let end_shift = 8 - (begin + n);
    let mask = (0xFF >> begin) & (0xFF << end_shift) as u8;
    (b & mask) as u16 >> end_shift
}

/// Reads a big-endian 24-bit value from the first three bytes of `b`.
pub(crate) fn get_24bits_from_bytes(b: &[u8]) -> u32 {
    ((b[0] as u32) << 16) + ((b[1] as u32) << 8) + (b[2] as u32)
}

/// Accumulates bit fields, most significant first, into a word of a fixed
/// width. Appending more bits than the width holds is an error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BitWriter {
    value: u32,
    width: u32,
    written: u32,
}

impl BitWriter {
    pub(crate) fn new_u16() -> Self {
        BitWriter {
            value: 0,
            width: 16,
            written: 0,
        }
    }

    pub(crate) fn new_u32() -> Self {
        BitWriter {
            value: 0,
            width: 32,
            written: 0,
        }
    }

    /// Appends the low `n` bits of `val`.
    pub(crate) fn append(&mut self, n: u32, val: u32) -> Result<(), Error> {
        if n == 0 || self.written + n > self.width {
            return Err(Error::InvalidSizeOrStartIndex);
        }
        self.value = append_nbits_to_uint32(self.value, n, val);
        self.written += n;
        Ok(())
    }

    /// Returns the accumulated word, with unwritten trailing bits set to zero.
    pub(crate) fn finish(self) -> u32 {
        self.value
            .checked_shl(self.width - self.written)
            .unwrap_or(0)
    }

    pub(crate) fn finish_u16(self) -> u16 {
        debug_assert_eq!(self.width, 16);
        self.finish() as u16
    }
}
