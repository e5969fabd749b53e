//! Canonical Huffman decoding tables.
//!
//! Tables are stored the canonical way: the number of codes of each length
//! plus the symbols sorted by (length, symbol). Decoding walks the code one
//! bit at a time, which keeps the whole decoder state in a few integers that
//! survive a suspension in the middle of a codeword.

use crate::bit_reader::BitReader;
use crate::error::{FormatError, Result};
use crate::source::ByteSource;

/// Maximum code length for DEFLATE Huffman codes.
pub const MAX_BITS: usize = 15;

/// Huffman decoding table built from code lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTable {
    /// Number of codes of each length; `counts[0]` is always zero.
    counts: [u16; MAX_BITS + 1],
    /// Symbols ordered by code length, then by symbol value.
    symbols: Vec<u16>,
    /// Longest code length in use.
    max_len: u8,
}

/// A codeword decoded part-way.
///
/// Holds the bits read so far together with the running canonical offsets,
/// so decoding can pick up again with the next bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialCode {
    code: i32,
    first: i32,
    index: i32,
    len: u8,
}

impl PartialCode {
    /// Number of bits of the codeword consumed so far.
    pub fn bits(&self) -> u8 {
        self.len
    }
}

impl HuffmanTable {
    /// Build a table from per-symbol code lengths, rejecting invalid codes.
    ///
    /// A valid code is either complete, empty (all lengths zero), or the
    /// degenerate single code of length 1.
    pub fn build(lengths: &[u8]) -> Result<Self> {
        let table = Self::canonical(lengths);

        let mut left: i32 = 1;
        for len in 1..=MAX_BITS {
            left <<= 1;
            left -= table.counts[len] as i32;
            if left < 0 {
                return Err(FormatError::OversubscribedCode.into());
            }
        }

        let total = table.symbols.len();
        let single = total == 1 && table.counts[1] == 1;
        if left > 0 && total > 0 && !single {
            return Err(FormatError::IncompleteCode.into());
        }
        Ok(table)
    }

    /// Canonical assignment without validation, for the fixed tables.
    pub(crate) fn canonical(lengths: &[u8]) -> Self {
        debug_assert!(lengths.iter().all(|&len| len as usize <= MAX_BITS));

        let mut counts = [0u16; MAX_BITS + 1];
        for &len in lengths {
            counts[len as usize] += 1;
        }
        counts[0] = 0;

        // Offset of the first symbol of each length in `symbols`.
        let mut offsets = [0u16; MAX_BITS + 2];
        for len in 1..=MAX_BITS {
            offsets[len + 1] = offsets[len] + counts[len];
        }

        let total = offsets[MAX_BITS + 1] as usize;
        let mut symbols = vec![0u16; total];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                let slot = &mut offsets[len as usize];
                symbols[*slot as usize] = symbol as u16;
                *slot += 1;
            }
        }

        let max_len = (1..=MAX_BITS)
            .rev()
            .find(|&len| counts[len] > 0)
            .unwrap_or(0) as u8;

        Self {
            counts,
            symbols,
            max_len,
        }
    }

    /// Whether the table holds no codes at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Longest code length in use, or 0 for an empty table.
    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    /// Decode one symbol, resuming from `partial`.
    ///
    /// Returns `Ok(None)` if the source ran dry mid-codeword; `partial` then
    /// holds the bits read so far and must be passed back unchanged on the
    /// next call. On success `partial` is reset.
    pub fn decode<S: ByteSource>(
        &self,
        reader: &mut BitReader<S>,
        partial: &mut PartialCode,
    ) -> Result<Option<u16>> {
        // No codeword is longer than `max_len`, so more bits cannot match.
        while partial.len < self.max_len {
            let Some(bit) = reader.pull_bits(1)? else {
                return Ok(None);
            };
            partial.len += 1;
            partial.code |= bit as i32;

            let count = self.counts[partial.len as usize] as i32;
            if partial.code - count < partial.first {
                let symbol = self.symbols[(partial.index + partial.code - partial.first) as usize];
                *partial = PartialCode::default();
                return Ok(Some(symbol));
            }
            partial.index += count;
            partial.first = (partial.first + count) << 1;
            partial.code <<= 1;
        }
        Err(FormatError::InvalidCode.into())
    }

    /// Codeword assigned to each symbol, as `(code, length)`, MSB-first.
    ///
    /// Symbols without a code get `(0, 0)`.
    pub fn codes(&self, num_symbols: usize) -> Vec<(u16, u8)> {
        let mut codes = vec![(0u16, 0u8); num_symbols];
        let mut code = 0u16;
        let mut index = 0usize;
        for len in 1..=MAX_BITS {
            let count = self.counts[len] as usize;
            for &symbol in &self.symbols[index..index + count] {
                if let Some(slot) = codes.get_mut(symbol as usize) {
                    *slot = (code, len as u8);
                }
                code += 1;
            }
            index += count;
            code <<= 1;
        }
        codes
    }
}
