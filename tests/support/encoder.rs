//! Minimal DEFLATE / DEFLATE64 encoder for round-trip tests.
//!
//! Emits stored and fixed-Huffman blocks only, with a greedy hash-chain
//! matcher. The point is to exercise the decoder's long lengths (code 285)
//! and long distances (codes 30 and 31), not to compress well.

#![allow(dead_code)]

use std::collections::HashMap;

const LENGTH_BASE: [u32; 28] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227,
];
const LENGTH_EXTRA: [u8; 28] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5,
];
const DISTANCE_BASE: [u32; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];
const DISTANCE_EXTRA: [u8; 32] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14,
];

/// Which flavor of stream to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Deflate,
    Deflate64,
}

impl Flavor {
    pub fn max_distance(self) -> usize {
        match self {
            Flavor::Deflate => 32 * 1024,
            Flavor::Deflate64 => 64 * 1024,
        }
    }

    pub fn max_length(self) -> usize {
        match self {
            Flavor::Deflate => 258,
            Flavor::Deflate64 => 65538,
        }
    }
}

/// LSB-first bit sink with DEFLATE token helpers.
#[derive(Debug)]
pub struct TokenWriter {
    out: Vec<u8>,
    bit_buf: u64,
    bit_count: u32,
    flavor: Flavor,
}

impl TokenWriter {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            out: Vec::new(),
            bit_buf: 0,
            bit_count: 0,
            flavor,
        }
    }

    pub fn write_bits(&mut self, value: u32, count: u8) {
        self.bit_buf |= (value as u64) << self.bit_count;
        self.bit_count += count as u32;
        while self.bit_count >= 8 {
            self.out.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Huffman codes go out most significant bit first.
    fn write_code(&mut self, code: u32, len: u8) {
        let mut reversed = 0;
        for i in 0..len {
            reversed |= ((code >> i) & 1) << (len - 1 - i);
        }
        self.write_bits(reversed, len);
    }

    fn align(&mut self) {
        if self.bit_count > 0 {
            self.out.push(self.bit_buf as u8);
            self.bit_buf = 0;
            self.bit_count = 0;
        }
    }

    fn fixed_symbol(&mut self, symbol: u16) {
        let symbol = symbol as u32;
        match symbol {
            0..=143 => self.write_code(0x30 + symbol, 8),
            144..=255 => self.write_code(0x190 + symbol - 144, 9),
            256..=279 => self.write_code(symbol - 256, 7),
            _ => self.write_code(0xC0 + symbol - 280, 8),
        }
    }

    pub fn stored_block(&mut self, last: bool, data: &[u8]) {
        assert!(data.len() <= u16::MAX as usize);
        self.write_bits(last as u32, 1);
        self.write_bits(0, 2);
        self.align();
        let len = data.len() as u32;
        self.write_bits(len, 16);
        self.write_bits(!len & 0xFFFF, 16);
        self.out.extend_from_slice(data);
    }

    pub fn begin_fixed(&mut self, last: bool) {
        self.write_bits(last as u32, 1);
        self.write_bits(1, 2);
    }

    pub fn literal(&mut self, byte: u8) {
        self.fixed_symbol(byte as u16);
    }

    pub fn back_ref(&mut self, length: usize, distance: usize) {
        assert!(length >= 3 && length <= self.flavor.max_length());
        assert!(distance >= 1 && distance <= self.flavor.max_distance());
        let length = length as u32;
        if length > 258 || (self.flavor == Flavor::Deflate && length == 258) {
            let (extra, bits) = match self.flavor {
                Flavor::Deflate64 => (length - 3, 16),
                Flavor::Deflate => (0, 0),
            };
            self.fixed_symbol(285);
            self.write_bits(extra, bits);
        } else {
            let i = LENGTH_BASE.iter().rposition(|&b| b <= length).unwrap_or(0);
            self.fixed_symbol(257 + i as u16);
            self.write_bits(length - LENGTH_BASE[i], LENGTH_EXTRA[i]);
        }

        let distance = distance as u32;
        let i = DISTANCE_BASE
            .iter()
            .rposition(|&b| b <= distance)
            .unwrap_or(0);
        self.write_code(i as u32, 5);
        self.write_bits(distance - DISTANCE_BASE[i], DISTANCE_EXTRA[i]);
    }

    pub fn end_block(&mut self) {
        self.fixed_symbol(256);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.out
    }
}

/// One LZ77 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: usize, distance: usize },
}

/// Greedy LZ77 parse with a bounded hash chain.
pub fn tokenize(data: &[u8], flavor: Flavor) -> Vec<Token> {
    const CHAIN_DEPTH: usize = 48;
    let mut heads: HashMap<[u8; 3], Vec<usize>> = HashMap::new();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let mut best = (0usize, 0usize);
        if pos + 3 <= data.len() {
            let key = [data[pos], data[pos + 1], data[pos + 2]];
            if let Some(chain) = heads.get(&key) {
                for &candidate in chain.iter().rev().take(CHAIN_DEPTH) {
                    let distance = pos - candidate;
                    if distance > flavor.max_distance() {
                        break;
                    }
                    let limit = (data.len() - pos).min(flavor.max_length());
                    let mut len = 0;
                    while len < limit && data[candidate + len] == data[pos + len] {
                        len += 1;
                    }
                    if len > best.0 {
                        best = (len, distance);
                    }
                }
            }
        }

        let step = if best.0 >= 3 {
            tokens.push(Token::Match {
                length: best.0,
                distance: best.1,
            });
            best.0
        } else {
            tokens.push(Token::Literal(data[pos]));
            1
        };
        for p in pos..(pos + step).min(data.len().saturating_sub(2)) {
            heads
                .entry([data[p], data[p + 1], data[p + 2]])
                .or_default()
                .push(p);
        }
        pos += step;
    }
    tokens
}

/// Encode `data` as fixed-Huffman blocks of at most `tokens_per_block` tokens.
///
/// Every third block is written as a stored block of the bytes it covers, so
/// both block kinds share one window.
pub fn compress(data: &[u8], flavor: Flavor, tokens_per_block: usize) -> Vec<u8> {
    let tokens = tokenize(data, flavor);
    let mut writer = TokenWriter::new(flavor);
    if tokens.is_empty() {
        writer.begin_fixed(true);
        writer.end_block();
        return writer.finish();
    }

    let blocks: Vec<&[Token]> = tokens.chunks(tokens_per_block.max(1)).collect();
    let mut offset = 0;
    for (i, block) in blocks.iter().enumerate() {
        let last = i + 1 == blocks.len();
        let covered: usize = block
            .iter()
            .map(|t| match t {
                Token::Literal(_) => 1,
                Token::Match { length, .. } => *length,
            })
            .sum();

        if i % 3 == 2 && covered <= u16::MAX as usize {
            writer.stored_block(last, &data[offset..offset + covered]);
        } else {
            writer.begin_fixed(last);
            for token in block.iter() {
                match *token {
                    Token::Literal(b) => writer.literal(b),
                    Token::Match { length, distance } => writer.back_ref(length, distance),
                }
            }
            writer.end_block();
        }
        offset += covered;
    }
    writer.finish()
}
