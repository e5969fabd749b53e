//! Block-level parsing: block headers, stored-block lengths, dynamic Huffman
//! headers, and the length/distance code semantics of each variant.

use std::sync::OnceLock;

use crate::bit_reader::BitReader;
use crate::error::{FormatError, Result};
use crate::huffman::{HuffmanTable, PartialCode};
use crate::source::ByteSource;

/// Size of the history window, which is also the largest DEFLATE64 distance.
pub const WINDOW_SIZE: usize = 1 << 16;

/// End-of-block symbol in the literal/length alphabet.
pub const END_OF_BLOCK: u16 = 256;

/// Number of literal/length symbols with fixed-code lengths (incl. 286/287).
pub const NUM_LITLEN_SYMBOLS: usize = 288;

/// Number of distance symbols (DEFLATE64 uses all 32).
pub const NUM_DISTANCE_SYMBOLS: usize = 32;

/// Length code base values (codes 257-285), DEFLATE semantics.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for length codes, DEFLATE semantics.
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values (codes 0-31). Codes 30 and 31 are DEFLATE64 only.
const DISTANCE_BASE: [u32; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 32769, 49153,
];

/// Extra bits for distance codes.
const DISTANCE_EXTRA: [u8; 32] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13, 14, 14,
];

/// Order of code length codes for dynamic Huffman.
pub(crate) const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Bitstream flavor understood by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Variant {
    /// Plain DEFLATE (RFC 1951), 32 KiB window.
    Deflate,
    /// DEFLATE64: 64 KiB window, 16-bit length code 285, distance codes 30/31.
    #[default]
    Deflate64,
}

impl Variant {
    /// Largest back-reference distance the variant can express.
    pub const fn max_distance(self) -> u32 {
        match self {
            Variant::Deflate => 32768,
            Variant::Deflate64 => WINDOW_SIZE as u32,
        }
    }

    /// Largest back-reference length the variant can express.
    pub const fn max_length(self) -> u32 {
        match self {
            Variant::Deflate => 258,
            Variant::Deflate64 => 65538,
        }
    }

    /// Number of distance codes a dynamic header may declare.
    const fn max_distance_codes(self) -> usize {
        match self {
            Variant::Deflate => 30,
            Variant::Deflate64 => 32,
        }
    }

    /// Base length and extra-bit count for literal/length symbol 257..=285.
    pub fn length_code(self, symbol: u16) -> Result<Code> {
        match (self, symbol) {
            (Variant::Deflate64, 285) => Ok(Code { base: 3, extra: 16 }),
            (_, 257..=285) => {
                let index = (symbol - 257) as usize;
                Ok(Code {
                    base: LENGTH_BASE[index] as u32,
                    extra: LENGTH_EXTRA[index],
                })
            }
            _ => Err(FormatError::ReservedLengthSymbol(symbol).into()),
        }
    }

    /// Base distance and extra-bit count for a distance symbol.
    pub fn distance_code(self, symbol: u16) -> Result<Code> {
        let index = symbol as usize;
        if index >= self.max_distance_codes() {
            return Err(FormatError::ReservedDistanceSymbol(symbol).into());
        }
        Ok(Code {
            base: DISTANCE_BASE[index],
            extra: DISTANCE_EXTRA[index],
        })
    }
}

/// A length or distance code: the value is `base` plus `extra` raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    /// Smallest value the code represents.
    pub base: u32,
    /// Number of extra bits following the code.
    pub extra: u8,
}

impl Code {
    /// Largest value the code represents.
    pub fn max(&self) -> u32 {
        self.base + ((1u32 << self.extra) - 1)
    }
}

/// How the data of a block is coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Raw bytes preceded by LEN/NLEN.
    Stored,
    /// Huffman coded with the fixed tables.
    Fixed,
    /// Huffman coded with tables sent in the block header.
    Dynamic,
}

/// The 3-bit header that opens every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// BFINAL: this is the last block of the stream.
    pub last: bool,
    /// BTYPE.
    pub kind: BlockKind,
}

/// Read a block header, or `None` if the source is starved.
pub fn read_block_header<S: ByteSource>(reader: &mut BitReader<S>) -> Result<Option<BlockHeader>> {
    let Some(bits) = reader.pull_bits(3)? else {
        return Ok(None);
    };
    let kind = match bits >> 1 {
        0 => BlockKind::Stored,
        1 => BlockKind::Fixed,
        2 => BlockKind::Dynamic,
        _ => return Err(FormatError::ReservedBlockType.into()),
    };
    Ok(Some(BlockHeader {
        last: bits & 1 == 1,
        kind,
    }))
}

/// Read and check LEN/NLEN of a stored block. The reader must be byte-aligned.
pub fn read_stored_length<S: ByteSource>(reader: &mut BitReader<S>) -> Result<Option<u16>> {
    let Some(word) = reader.pull_bits(32)? else {
        return Ok(None);
    };
    let len = word as u16;
    let nlen = (word >> 16) as u16;
    if len != !nlen {
        return Err(FormatError::StoredLengthMismatch { len, nlen }.into());
    }
    Ok(Some(len))
}

/// The pair of tables that decodes a Huffman block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTables {
    /// Literal/length table.
    pub literal: HuffmanTable,
    /// Distance table.
    pub distance: HuffmanTable,
}

/// The fixed tables of RFC 1951 section 3.2.6, built once per process.
pub fn fixed_tables() -> &'static BlockTables {
    static FIXED: OnceLock<BlockTables> = OnceLock::new();
    FIXED.get_or_init(|| {
        let mut lengths = [0u8; NUM_LITLEN_SYMBOLS];
        lengths[..144].fill(8);
        lengths[144..256].fill(9);
        lengths[256..280].fill(7);
        lengths[280..].fill(8);
        BlockTables {
            literal: HuffmanTable::canonical(&lengths),
            distance: HuffmanTable::canonical(&[5; NUM_DISTANCE_SYMBOLS]),
        }
    })
}

/// Where a dynamic header is in its parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStep {
    /// HLIT, HDIST and HCLEN.
    Counts,
    /// 3-bit code-length-code lengths; `next` of HCLEN done.
    CodeLengthCodes { next: usize },
    /// Decoding a code-length symbol.
    Lengths,
    /// Have repeat symbol 16, 17 or 18; need its extra bits.
    Repeat { symbol: u16 },
}

/// Resumable parser for the header of a dynamic Huffman block.
#[derive(Debug, Clone)]
pub struct DynamicHeader {
    step: HeaderStep,
    num_literals: usize,
    num_distances: usize,
    num_code_lengths: usize,
    code_length_lengths: [u8; 19],
    code_length_table: HuffmanTable,
    lengths: [u8; NUM_LITLEN_SYMBOLS + NUM_DISTANCE_SYMBOLS],
    filled: usize,
    partial: PartialCode,
}

impl Default for DynamicHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicHeader {
    /// Start parsing a dynamic header; the 3-bit block header is already read.
    pub fn new() -> Self {
        Self {
            step: HeaderStep::Counts,
            num_literals: 0,
            num_distances: 0,
            num_code_lengths: 0,
            code_length_lengths: [0; 19],
            code_length_table: HuffmanTable::canonical(&[]),
            lengths: [0; NUM_LITLEN_SYMBOLS + NUM_DISTANCE_SYMBOLS],
            filled: 0,
            partial: PartialCode::default(),
        }
    }

    /// Continue parsing.
    ///
    /// Returns the block's tables once the header is complete, or `None` if
    /// the source ran dry; call again with the same reader after refilling.
    pub fn advance<S: ByteSource>(
        &mut self,
        reader: &mut BitReader<S>,
        variant: Variant,
    ) -> Result<Option<BlockTables>> {
        loop {
            match self.step {
                HeaderStep::Counts => {
                    let Some(bits) = reader.pull_bits(14)? else {
                        return Ok(None);
                    };
                    self.num_literals = (bits & 0x1F) as usize + 257;
                    self.num_distances = ((bits >> 5) & 0x1F) as usize + 1;
                    self.num_code_lengths = ((bits >> 10) & 0xF) as usize + 4;
                    if self.num_literals > 286 || self.num_distances > variant.max_distance_codes()
                    {
                        return Err(FormatError::TooManyCodes {
                            literals: self.num_literals,
                            distances: self.num_distances,
                        }
                        .into());
                    }
                    self.step = HeaderStep::CodeLengthCodes { next: 0 };
                }
                HeaderStep::CodeLengthCodes { next } => {
                    if next == self.num_code_lengths {
                        self.code_length_table = HuffmanTable::build(&self.code_length_lengths)?;
                        self.step = HeaderStep::Lengths;
                        continue;
                    }
                    let Some(len) = reader.pull_bits(3)? else {
                        return Ok(None);
                    };
                    self.code_length_lengths[CODE_LENGTH_ORDER[next]] = len as u8;
                    self.step = HeaderStep::CodeLengthCodes { next: next + 1 };
                }
                HeaderStep::Lengths => {
                    let total = self.num_literals + self.num_distances;
                    if self.filled == total {
                        return self.finish().map(Some);
                    }
                    let Some(symbol) = self.code_length_table.decode(reader, &mut self.partial)?
                    else {
                        return Ok(None);
                    };
                    match symbol {
                        0..=15 => {
                            self.lengths[self.filled] = symbol as u8;
                            self.filled += 1;
                        }
                        16 if self.filled == 0 => {
                            return Err(FormatError::RepeatWithoutPrevious.into());
                        }
                        16..=18 => self.step = HeaderStep::Repeat { symbol },
                        _ => return Err(FormatError::InvalidCode.into()),
                    }
                }
                HeaderStep::Repeat { symbol } => {
                    let (extra, base, value) = match symbol {
                        16 => (2, 3, self.lengths[self.filled - 1]),
                        17 => (3, 3, 0),
                        _ => (7, 11, 0),
                    };
                    let Some(bits) = reader.pull_bits(extra)? else {
                        return Ok(None);
                    };
                    let repeat = base + bits as usize;
                    let end = self.filled + repeat;
                    if end > self.num_literals + self.num_distances {
                        return Err(FormatError::CodeLengthOverflow.into());
                    }
                    self.lengths[self.filled..end].fill(value);
                    self.filled = end;
                    self.step = HeaderStep::Lengths;
                }
            }
        }
    }

    /// Build the literal/length and distance tables from the decoded lengths.
    fn finish(&self) -> Result<BlockTables> {
        let (literal, distance) = self.lengths[..self.num_literals + self.num_distances]
            .split_at(self.num_literals);
        if literal[END_OF_BLOCK as usize] == 0 {
            return Err(FormatError::MissingEndOfBlock.into());
        }
        let tables = BlockTables {
            literal: HuffmanTable::build(literal)?,
            distance: HuffmanTable::build(distance)?,
        };
        tracing::debug!(
            literals = self.num_literals,
            distances = self.num_distances,
            code_lengths = self.num_code_lengths,
            "dynamic tables built"
        );
        Ok(tables)
    }
}
