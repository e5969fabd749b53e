//! Bit-level reader over a [`ByteSource`].
//!
//! Bits are served LSB-first, as DEFLATE packs them. Every read is atomic:
//! it either returns all requested bits or consumes nothing and reports that
//! the source is starved, so callers can suspend and retry the same read later.

use crate::error::{Error, Result};
use crate::source::ByteSource;

/// Largest single read supported by [`BitReader::pull_bits`].
pub const MAX_PULL: u8 = 32;

/// Bit reader for LSB-first bit streams pulled from a byte source.
///
/// Maintains a bit buffer filled from an internal byte buffer, which is in
/// turn refilled from the source on demand. Bytes taken from the source are
/// never handed back, so nothing is ever read twice.
#[derive(Debug)]
pub struct BitReader<S> {
    source: S,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    bit_buf: u64,
    bits_in_buf: u8,
    at_end: bool,
}

impl<S: ByteSource> BitReader<S> {
    /// Create a bit reader with an input buffer of `capacity` bytes.
    pub fn new(source: S, capacity: usize) -> Self {
        Self {
            source,
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            len: 0,
            bit_buf: 0,
            bits_in_buf: 0,
            at_end: false,
        }
    }

    /// Pull the next batch of bytes from the source.
    ///
    /// Returns `Ok(false)` when the source has nothing available right now.
    fn refill(&mut self) -> Result<bool> {
        debug_assert_eq!(self.pos, self.len);
        if self.at_end {
            return Err(Error::TruncatedInput);
        }
        let outcome = self.source.read(&mut self.buf)?;
        debug_assert!(outcome.len <= self.buf.len());
        self.pos = 0;
        self.len = outcome.len.min(self.buf.len());
        self.at_end = outcome.at_end;
        if self.len > 0 {
            Ok(true)
        } else if self.at_end {
            Err(Error::TruncatedInput)
        } else {
            Ok(false)
        }
    }

    /// Ensure at least `n` bits are buffered.
    #[inline]
    fn ensure(&mut self, n: u8) -> Result<bool> {
        while self.bits_in_buf < n {
            if self.pos == self.len && !self.refill()? {
                return Ok(false);
            }
            self.bit_buf |= (self.buf[self.pos] as u64) << self.bits_in_buf;
            self.pos += 1;
            self.bits_in_buf += 8;
        }
        Ok(true)
    }

    /// Read `n` bits LSB-first, or `None` if the source is starved.
    ///
    /// Nothing is consumed when `None` is returned. Fails with
    /// [`Error::TruncatedInput`] if the source has ended before `n` bits
    /// became available.
    #[inline]
    pub fn pull_bits(&mut self, n: u8) -> Result<Option<u32>> {
        debug_assert!(n <= MAX_PULL);
        if n == 0 {
            return Ok(Some(0));
        }
        if !self.ensure(n)? {
            return Ok(None);
        }
        let val = (self.bit_buf & ((1u64 << n) - 1)) as u32;
        self.bit_buf >>= n;
        self.bits_in_buf -= n;
        Ok(Some(val))
    }

    /// Align to byte boundary (discard remaining bits in current byte).
    pub fn align_to_byte(&mut self) {
        let discard = self.bits_in_buf % 8;
        self.bit_buf >>= discard;
        self.bits_in_buf -= discard;
    }

    /// Copy byte-aligned raw data into `out`.
    ///
    /// Returns the number of bytes copied, which is less than `out.len()` when
    /// the source is starved. Fails with [`Error::TruncatedInput`] if the
    /// source has ended before any byte could be copied.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<usize> {
        debug_assert_eq!(self.bits_in_buf % 8, 0, "read_bytes requires byte alignment");

        // Whole bytes still sitting in the bit buffer come first.
        let mut copied = 0;
        while copied < out.len() && self.bits_in_buf >= 8 {
            out[copied] = self.bit_buf as u8;
            self.bit_buf >>= 8;
            self.bits_in_buf -= 8;
            copied += 1;
        }

        while copied < out.len() {
            if self.pos == self.len {
                if copied > 0 && self.at_end {
                    break;
                }
                if !self.refill()? {
                    break;
                }
            }
            let n = (out.len() - copied).min(self.len - self.pos);
            out[copied..copied + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            copied += n;
        }
        Ok(copied)
    }

    /// Whether the source has reported its end.
    pub fn source_ended(&self) -> bool {
        self.at_end
    }

    /// Bytes pulled from the source but not yet consumed (whole bytes only).
    pub fn buffered_bytes(&self) -> usize {
        self.len - self.pos + (self.bits_in_buf as usize / 8)
    }

    /// Borrow the source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the source. Buffered but unconsumed bytes are dropped.
    pub fn into_source(self) -> S {
        self.source
    }
}
