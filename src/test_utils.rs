//! Helpers for building bitstreams by hand in unit tests.

use std::io;

use crate::block::{Variant, CODE_LENGTH_ORDER, NUM_DISTANCE_SYMBOLS, NUM_LITLEN_SYMBOLS};
use crate::huffman::HuffmanTable;
use crate::source::{ByteSource, ReadOutcome};

/// A bit writer that packs bits into bytes, LSB first.
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    current_byte: u8,
    bit_position: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `num_bits` of `value`, LSB first.
    pub fn write_bits(&mut self, value: u32, num_bits: u8) {
        for i in 0..num_bits {
            self.current_byte |= (((value >> i) & 1) as u8) << self.bit_position;
            self.bit_position += 1;
            if self.bit_position == 8 {
                self.buffer.push(self.current_byte);
                self.current_byte = 0;
                self.bit_position = 0;
            }
        }
    }

    /// Write a Huffman codeword, most significant bit first.
    pub fn write_code(&mut self, code: u32, len: u8) {
        for i in (0..len).rev() {
            self.write_bits((code >> i) & 1, 1);
        }
    }

    /// Pad the partial byte with zeros.
    pub fn align(&mut self) {
        if self.bit_position > 0 {
            self.buffer.push(self.current_byte);
            self.current_byte = 0;
            self.bit_position = 0;
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bit_position, 0);
        self.buffer.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.buffer
    }
}

/// Writes stored, fixed and dynamic Huffman blocks token by token.
pub struct StreamWriter {
    bits: BitWriter,
    variant: Variant,
    /// Codes of the block being written.
    literal_codes: Vec<(u16, u8)>,
    distance_codes: Vec<(u16, u8)>,
}

fn fixed_codes() -> (Vec<(u16, u8)>, Vec<(u16, u8)>) {
    let tables = crate::block::fixed_tables();
    (
        tables.literal.codes(NUM_LITLEN_SYMBOLS),
        tables.distance.codes(NUM_DISTANCE_SYMBOLS),
    )
}

impl StreamWriter {
    pub fn new(variant: Variant) -> Self {
        let (literal_codes, distance_codes) = fixed_codes();
        Self {
            bits: BitWriter::new(),
            variant,
            literal_codes,
            distance_codes,
        }
    }

    /// Stored block holding `data`.
    pub fn stored(&mut self, last: bool, data: &[u8]) -> &mut Self {
        assert!(data.len() <= u16::MAX as usize);
        self.bits.write_bits(last as u32, 1);
        self.bits.write_bits(0, 2);
        self.bits.align();
        let len = data.len() as u32;
        self.bits.write_bits(len, 16);
        self.bits.write_bits(!len & 0xFFFF, 16);
        self.bits.write_bytes(data);
        self
    }

    /// Open a fixed-Huffman block.
    pub fn fixed(&mut self, last: bool) -> &mut Self {
        self.bits.write_bits(last as u32, 1);
        self.bits.write_bits(1, 2);
        (self.literal_codes, self.distance_codes) = fixed_codes();
        self
    }

    /// Open a dynamic-Huffman block with the given code lengths.
    ///
    /// HLIT and HDIST come from the slice lengths and HCLEN is always 19.
    /// Every length is sent as a plain code-length symbol, no repeats.
    pub fn dynamic(
        &mut self,
        last: bool,
        literal_lengths: &[u8],
        distance_lengths: &[u8],
    ) -> &mut Self {
        // 0..=12 get 4 bits, 13..=18 get 5 bits: a complete code.
        let mut cl_lengths = [5u8; 19];
        cl_lengths[..13].fill(4);
        let cl_codes = HuffmanTable::build(&cl_lengths)
            .expect("complete code-length code")
            .codes(19);

        self.bits.write_bits(last as u32, 1);
        self.bits.write_bits(2, 2);
        self.bits.write_bits(literal_lengths.len() as u32 - 257, 5);
        self.bits.write_bits(distance_lengths.len() as u32 - 1, 5);
        self.bits.write_bits(19 - 4, 4);
        for &index in &CODE_LENGTH_ORDER {
            self.bits.write_bits(cl_lengths[index] as u32, 3);
        }
        for &len in literal_lengths.iter().chain(distance_lengths) {
            let (code, n) = cl_codes[len as usize];
            self.bits.write_code(code as u32, n);
        }

        self.literal_codes = HuffmanTable::build(literal_lengths)
            .expect("valid literal/length code")
            .codes(NUM_LITLEN_SYMBOLS);
        self.distance_codes = HuffmanTable::build(distance_lengths)
            .expect("valid distance code")
            .codes(NUM_DISTANCE_SYMBOLS);
        self
    }

    /// Any literal/length symbol with the current block's code.
    pub fn symbol(&mut self, symbol: u16) -> &mut Self {
        let (code, len) = self.literal_codes[symbol as usize];
        self.bits.write_code(code as u32, len);
        self
    }

    pub fn literals(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            self.symbol(b as u16);
        }
        self
    }

    /// Length symbol plus its raw extra bits.
    pub fn length_symbol(&mut self, symbol: u16, extra: u32) -> &mut Self {
        let code = self.variant.length_code(symbol).expect("valid length symbol");
        self.symbol(symbol);
        self.bits.write_bits(extra, code.extra);
        self
    }

    /// Distance symbol with the current block's code, plus its raw extra bits.
    pub fn distance_symbol(&mut self, symbol: u16, extra: u32) -> &mut Self {
        let code = Variant::Deflate64
            .distance_code(symbol)
            .expect("valid distance symbol");
        let (bits, len) = self.distance_codes[symbol as usize];
        self.bits.write_code(bits as u32, len);
        self.bits.write_bits(extra, code.extra);
        self
    }

    /// Back-reference, choosing the codes the way an encoder would.
    pub fn back_ref(&mut self, length: u32, distance: u32) -> &mut Self {
        let variant = self.variant;
        let (symbol, extra) = (257..=285u16)
            .filter_map(|s| {
                let code = variant.length_code(s).ok()?;
                (code.base <= length && length <= code.max()).then_some((s, length - code.base))
            })
            .next()
            .expect("length in range");
        self.length_symbol(symbol, extra);

        let (symbol, extra) = (0..32u16)
            .filter_map(|s| {
                let code = variant.distance_code(s).ok()?;
                (code.base <= distance && distance <= code.max())
                    .then_some((s, distance - code.base))
            })
            .next()
            .expect("distance in range");
        self.distance_symbol(symbol, extra)
    }

    pub fn end_block(&mut self) -> &mut Self {
        self.symbol(256)
    }

    /// Raw bits, for malformed streams.
    pub fn raw_bits(&mut self, value: u32, num_bits: u8) -> &mut Self {
        self.bits.write_bits(value, num_bits);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bits.finish()
    }
}

/// Hands out `chunk` bytes per read, answering "nothing yet" in between.
pub struct ChunkedSource {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    starve_next: bool,
}

impl ChunkedSource {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk: chunk.max(1),
            starve_next: false,
        }
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl ByteSource for ChunkedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if self.starve_next {
            self.starve_next = false;
            return Ok(ReadOutcome::more(0));
        }
        self.starve_next = true;
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(ReadOutcome {
            len: n,
            at_end: self.pos == self.data.len(),
        })
    }
}
