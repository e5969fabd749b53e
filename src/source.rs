//! Byte sources that feed compressed data into a decoder.
//!
//! A source hands out whatever bytes it has right now. Returning zero bytes
//! without `at_end` means "nothing available yet": the decoder suspends and
//! the caller retries later, after the source has more data.

use std::collections::VecDeque;
use std::io;

/// Result of a single [`ByteSource::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOutcome {
    /// Number of bytes written into the buffer.
    pub len: usize,
    /// The source has no more data, now or later.
    pub at_end: bool,
}

impl ReadOutcome {
    /// Some bytes were read and more may follow.
    pub fn more(len: usize) -> Self {
        Self { len, at_end: false }
    }

    /// `len` bytes were read and the source is exhausted.
    pub fn end(len: usize) -> Self {
        Self { len, at_end: true }
    }
}

/// A supplier of compressed bytes.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes.
    ///
    /// Implementations must not block to satisfy the full request and should
    /// return whatever is available. Errors are propagated to the caller of
    /// the decoder unchanged and leave the decoder failed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        (**self).read(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        (**self).read(buf)
    }
}

impl ByteSource for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let n = buf.len().min(self.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(ReadOutcome {
            len: n,
            at_end: self.is_empty(),
        })
    }
}

/// Adapts any [`io::Read`] into a [`ByteSource`].
///
/// `Ok(0)` from the reader marks the end of input. `WouldBlock` is reported as
/// "no data yet", which lets non-blocking sockets drive a decoder.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
}

impl<R: io::Read> IoSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the wrapped reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> ByteSource for IoSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::more(0));
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => return Ok(ReadOutcome::end(0)),
                Ok(n) => return Ok(ReadOutcome::more(n)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::more(0))
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// A push-fed source: the caller appends compressed chunks as they arrive
/// and calls [`Feed::finish`] once the last chunk has been pushed.
#[derive(Debug, Default, Clone)]
pub struct Feed {
    pending: VecDeque<u8>,
    finished: bool,
}

impl Feed {
    /// Create an empty, open feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append compressed bytes.
    ///
    /// Bytes pushed after [`Feed::finish`] are ignored.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.finished {
            tracing::warn!(len = chunk.len(), "ignoring bytes pushed after finish");
            return;
        }
        self.pending.extend(chunk);
    }

    /// Mark the end of input.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Whether [`Feed::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes pushed but not yet read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl ByteSource for Feed {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let n = buf.len().min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(ReadOutcome {
            len: n,
            at_end: self.finished && self.pending.is_empty(),
        })
    }
}
