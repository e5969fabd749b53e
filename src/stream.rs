//! Decoder abstraction and the `std::io::Read` adapter built on it.

use std::io::{self, Read};

use crate::error::Result;
use crate::inflate::{Inflater, Status};
use crate::options::InflateOptions;
use crate::source::{ByteSource, IoSource};

/// A pull-based decompressor.
///
/// Implemented by [`Inflater`] for both DEFLATE and DEFLATE64, so either can
/// sit behind an [`InflateReader`] or a `Box<dyn Decompress>`.
pub trait Decompress {
    /// Write decoded bytes into `out`, returning how many were written.
    fn fill(&mut self, out: &mut [u8]) -> Result<usize>;

    /// State after the last `fill`.
    fn status(&self) -> Status;

    /// Total bytes produced so far.
    fn total_out(&self) -> u64;
}

impl<S: ByteSource> Decompress for Inflater<S> {
    fn fill(&mut self, out: &mut [u8]) -> Result<usize> {
        Inflater::fill(self, out)
    }

    fn status(&self) -> Status {
        Inflater::status(self)
    }

    fn total_out(&self) -> u64 {
        Inflater::total_out(self)
    }
}

impl<D: Decompress + ?Sized> Decompress for &mut D {
    fn fill(&mut self, out: &mut [u8]) -> Result<usize> {
        (**self).fill(out)
    }

    fn status(&self) -> Status {
        (**self).status()
    }

    fn total_out(&self) -> u64 {
        (**self).total_out()
    }
}

impl<D: Decompress + ?Sized> Decompress for Box<D> {
    fn fill(&mut self, out: &mut [u8]) -> Result<usize> {
        (**self).fill(out)
    }

    fn status(&self) -> Status {
        (**self).status()
    }

    fn total_out(&self) -> u64 {
        (**self).total_out()
    }
}

/// [`Read`] adapter over any [`Decompress`] implementation.
///
/// A source with nothing available yet surfaces as
/// [`io::ErrorKind::WouldBlock`]; decode errors become `InvalidData`, a
/// truncated stream `UnexpectedEof`, and source errors pass through.
///
/// ```
/// use std::io::Read;
/// use inflate64::InflateReader;
///
/// let compressed: &[u8] = &[0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c'];
/// let mut out = String::new();
/// InflateReader::deflate64(compressed).read_to_string(&mut out).unwrap();
/// assert_eq!(out, "abc");
/// ```
#[derive(Debug)]
pub struct InflateReader<D> {
    decoder: D,
}

/// DEFLATE64 reader over any `io::Read`.
pub type Deflate64Reader<R> = InflateReader<Inflater<IoSource<R>>>;

impl<R: Read> InflateReader<Inflater<IoSource<R>>> {
    /// Decode `reader` with the given options.
    pub fn new(reader: R, options: InflateOptions) -> Self {
        Self::from_decoder(Inflater::with_options(IoSource::new(reader), options))
    }

    /// Decode a DEFLATE64 stream.
    pub fn deflate64(reader: R) -> Self {
        Self::new(reader, InflateOptions::deflate64())
    }

    /// Decode a plain DEFLATE stream.
    pub fn deflate(reader: R) -> Self {
        Self::new(reader, InflateOptions::deflate())
    }
}

impl<D: Decompress> InflateReader<D> {
    /// Wrap an existing decoder.
    pub fn from_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// Borrow the decoder.
    pub fn get_ref(&self) -> &D {
        &self.decoder
    }

    /// Mutably borrow the decoder.
    pub fn get_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    /// Unwrap the decoder.
    pub fn into_inner(self) -> D {
        self.decoder
    }
}

impl<D: Decompress> Read for InflateReader<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.decoder.fill(buf)?;
            if n > 0 {
                return Ok(n);
            }
            match self.decoder.status() {
                Status::Finished => return Ok(0),
                Status::NeedsInput => return Err(io::ErrorKind::WouldBlock.into()),
                // A failed decoder reports its error on the next fill.
                Status::Ready | Status::Failed => {}
            }
        }
    }
}
