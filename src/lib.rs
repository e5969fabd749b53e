//! # inflate64
//!
//! A streaming, resumable DEFLATE64 decompressor.
//!
//! DEFLATE64 ("Enhanced Deflate") is the DEFLATE variant used by some ZIP
//! archivers. It widens the history window to 64 KiB, turns length code 285
//! into a 16-extra-bit code covering 3..=65538, and adds distance codes 30 and
//! 31 reaching back up to 65536 bytes. Plain RFC 1951 DEFLATE is supported
//! through the same machinery.
//!
//! ## Features
//!
//! - **Incremental**: decoding suspends whenever the input runs dry or the
//!   output buffer is full, and resumes exactly where it stopped
//! - **Bounded memory**: one 64 KiB window plus a configurable input buffer
//! - **Pluggable input**: slices, any `io::Read`, or a push-style [`Feed`]
//! - **`io::Read` adapter** via [`InflateReader`]
//! - Optional `inflate64` command-line tool via the `cli` feature
//!
//! ## Example
//!
//! ```rust
//! // A stored block holding "hello", marked final.
//! let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'h', b'e', b'l', b'l', b'o'];
//! let data = inflate64::inflate64(&compressed).unwrap();
//! assert_eq!(data, b"hello");
//! ```
//!
//! Pushing input as it arrives:
//!
//! ```rust
//! use inflate64::{Feed, Inflater, Status};
//!
//! let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'h', b'e', b'l', b'l', b'o'];
//! let mut inflater = Inflater::new(Feed::new());
//! let mut out = Vec::new();
//! let mut buf = [0u8; 4];
//!
//! for chunk in compressed.chunks(3) {
//!     inflater.source_mut().push(chunk);
//!     loop {
//!         let n = inflater.fill(&mut buf).unwrap();
//!         out.extend_from_slice(&buf[..n]);
//!         if inflater.status() != Status::Ready {
//!             break;
//!         }
//!     }
//! }
//! assert!(inflater.is_finished());
//! assert_eq!(out, b"hello");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bit_reader;
pub mod block;
pub mod error;
pub mod huffman;
pub mod inflate;
pub mod options;
pub mod source;
pub mod stream;
pub mod window;

#[cfg(test)]
mod test_utils;

pub use block::Variant;
pub use error::{Error, FormatError, Result};
pub use inflate::{Inflater, Phase, Status};
pub use options::InflateOptions;
pub use source::{ByteSource, Feed, IoSource, ReadOutcome};
pub use stream::{Decompress, Deflate64Reader, InflateReader};

/// Decompress a complete DEFLATE64 stream held in memory.
pub fn inflate64(data: &[u8]) -> Result<Vec<u8>> {
    decompress(data, &InflateOptions::deflate64())
}

/// Decompress a complete plain DEFLATE stream held in memory.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    decompress(data, &InflateOptions::deflate())
}

/// Decompress a complete stream held in memory with explicit options.
///
/// Bytes after the end of the final block are ignored.
pub fn decompress(data: &[u8], options: &InflateOptions) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len().saturating_mul(3));
    decompress_into(&mut output, data, options)?;
    Ok(output)
}

/// Decompress into a caller-provided buffer, appending to it.
///
/// Returns the number of bytes appended. On error the buffer may hold a
/// partial result.
pub fn decompress_into(
    output: &mut Vec<u8>,
    data: &[u8],
    options: &InflateOptions,
) -> Result<usize> {
    let start = output.len();
    let mut inflater = Inflater::with_options(data, *options);
    let mut chunk = vec![0u8; block::WINDOW_SIZE];
    loop {
        let n = inflater.fill(&mut chunk)?;
        output.extend_from_slice(&chunk[..n]);
        match inflater.status() {
            Status::Finished => return Ok(output.len() - start),
            Status::Ready => {}
            Status::NeedsInput | Status::Failed => return Err(stalled(&inflater)),
        }
    }
}

/// Error for a slice-backed decoder that stopped before finishing.
fn stalled<S: ByteSource>(inflater: &Inflater<S>) -> Error {
    // A slice never starves, so stopping early means the data ran out.
    inflater.error().cloned().unwrap_or(Error::TruncatedInput)
}

/// Decompress a stream whose decompressed size is known up front.
///
/// Fails with [`Error::SizeMismatch`] if the stream produces a different
/// number of bytes.
pub fn decompress_with_size(
    data: &[u8],
    options: &InflateOptions,
    expected: usize,
) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected);
    let mut inflater = Inflater::with_options(data, *options);
    let mut buf = [0u8; 4096];
    loop {
        let n = inflater.fill(&mut buf)?;
        if output.len() + n > expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: output.len() + n,
            });
        }
        output.extend_from_slice(&buf[..n]);
        match inflater.status() {
            Status::Finished => break,
            Status::Ready => {}
            Status::NeedsInput | Status::Failed => return Err(stalled(&inflater)),
        }
    }
    if output.len() != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: output.len(),
        });
    }
    Ok(output)
}
