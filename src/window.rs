//! Circular history buffer that doubles as the output queue.
//!
//! Every produced byte lands in the window. Bytes stay "pending" until the
//! caller drains them; the window never overwrites pending bytes, so at most
//! one window of undrained output can exist at a time.

use crate::block::WINDOW_SIZE;
use crate::error::{FormatError, Result};

const MASK: usize = WINDOW_SIZE - 1;

/// 64 KiB sliding window with a pending-output region.
pub struct SlidingWindow {
    buf: Box<[u8]>,
    /// Next write position.
    write: usize,
    /// Produced but not yet drained.
    pending: usize,
    /// Total bytes ever produced.
    total: u64,
}

impl std::fmt::Debug for SlidingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindow")
            .field("write", &self.write)
            .field("pending", &self.pending)
            .field("total", &self.total)
            .finish()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self {
            buf: vec![0; WINDOW_SIZE].into_boxed_slice(),
            write: 0,
            pending: 0,
            total: 0,
        }
    }

    /// Bytes produced but not yet drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Room left before pending output would be overwritten.
    pub fn free(&self) -> usize {
        WINDOW_SIZE - self.pending
    }

    /// Total bytes produced since creation.
    pub fn total_out(&self) -> u64 {
        self.total
    }

    /// Bytes of history a back-reference may reach.
    pub fn history(&self) -> u32 {
        self.total.min(WINDOW_SIZE as u64) as u32
    }

    /// Append one byte.
    #[inline]
    pub fn emit(&mut self, byte: u8) {
        debug_assert!(self.pending < WINDOW_SIZE, "window full of undrained output");
        self.buf[self.write] = byte;
        self.write = (self.write + 1) & MASK;
        self.pending += 1;
        self.total += 1;
    }

    /// Check that `distance` reaches only bytes already produced.
    pub fn check_distance(&self, distance: u32) -> Result<()> {
        let available = self.history();
        if distance == 0 || distance > available {
            return Err(FormatError::DistanceTooFar {
                distance,
                available,
            }
            .into());
        }
        Ok(())
    }

    /// Copy `length` bytes starting `distance` bytes back.
    ///
    /// Copies one byte at a time: when `distance < length` the source runs
    /// into bytes written by this same copy, which repeats the pattern.
    pub fn copy_back(&mut self, distance: u32, length: usize) -> Result<()> {
        self.check_distance(distance)?;
        debug_assert!(length <= self.free());

        let mut src = (self.write + WINDOW_SIZE - distance as usize) & MASK;
        for _ in 0..length {
            self.buf[self.write] = self.buf[src];
            self.write = (self.write + 1) & MASK;
            src = (src + 1) & MASK;
        }
        self.pending += length;
        self.total += length as u64;
        Ok(())
    }

    /// Contiguous free space at the write position, at most `max` bytes.
    ///
    /// Fill a prefix of it and [`commit`](Self::commit) the count.
    pub fn spare_mut(&mut self, max: usize) -> &mut [u8] {
        let n = max.min(self.free()).min(WINDOW_SIZE - self.write);
        &mut self.buf[self.write..self.write + n]
    }

    /// Mark `n` bytes written through [`spare_mut`](Self::spare_mut) as produced.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.free() && self.write + n <= WINDOW_SIZE);
        self.write = (self.write + n) & MASK;
        self.pending += n;
        self.total += n as u64;
    }

    /// Move up to `out.len()` pending bytes into `out`, oldest first.
    pub fn drain(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.pending);
        let start = (self.write + WINDOW_SIZE - self.pending) & MASK;
        let first = n.min(WINDOW_SIZE - start);
        out[..first].copy_from_slice(&self.buf[start..start + first]);
        out[first..n].copy_from_slice(&self.buf[..n - first]);
        self.pending -= n;
        n
    }

    /// Drop all pending output.
    pub fn discard_pending(&mut self) {
        self.pending = 0;
    }
}
