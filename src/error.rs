//! Error types for the inflate64 library.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias for inflate64 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decompressing.
///
/// Every variant is terminal for the decoder that produced it: once a decoder
/// has failed, each later call reports the same error again. The type is
/// `Clone` for that reason, and source errors are shared behind an [`Arc`].
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The compressed data violates the bitstream format.
    #[error("invalid compressed data: {0}")]
    Format(#[from] FormatError),
    /// The source ended while a block or symbol was still incomplete.
    #[error("compressed stream ended unexpectedly")]
    TruncatedInput,
    /// The underlying byte source failed.
    #[error("byte source failed: {0}")]
    Source(#[source] Arc<io::Error>),
    /// Decompressed size did not match the size the caller expected.
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Size the caller expected.
        expected: usize,
        /// Size actually produced.
        actual: usize,
    },
}

impl Error {
    /// Returns the format violation, if this is a format error.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Error::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Source(Arc::new(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Source(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner,
                Err(shared) => io::Error::new(shared.kind(), shared.to_string()),
            },
            Error::TruncatedInput => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::Format(_) | Error::SizeMismatch { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
        }
    }
}

/// A specific violation of the DEFLATE / DEFLATE64 bitstream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Block type 3 is reserved.
    #[error("reserved block type")]
    ReservedBlockType,
    /// Stored block NLEN is not the one's complement of LEN.
    #[error("stored block length {len:#06x} does not match complement {nlen:#06x}")]
    StoredLengthMismatch {
        /// LEN field.
        len: u16,
        /// NLEN field.
        nlen: u16,
    },
    /// Code lengths describe more codes than the code space holds.
    #[error("over-subscribed Huffman code")]
    OversubscribedCode,
    /// Code lengths leave part of the code space unused.
    #[error("incomplete Huffman code")]
    IncompleteCode,
    /// The literal/length code has no end-of-block symbol.
    #[error("literal/length code is missing the end-of-block symbol")]
    MissingEndOfBlock,
    /// A bit sequence matched no codeword of the active table.
    #[error("invalid Huffman code")]
    InvalidCode,
    /// Dynamic header declares more codes than the format allows.
    #[error("too many codes: {literals} literal/length, {distances} distance")]
    TooManyCodes {
        /// Declared literal/length code count.
        literals: usize,
        /// Declared distance code count.
        distances: usize,
    },
    /// Code-length repeat (16) appeared before any length.
    #[error("repeat of previous code length with no previous length")]
    RepeatWithoutPrevious,
    /// Code-length run extends past the declared code counts.
    #[error("code length run overflows the declared code counts")]
    CodeLengthOverflow,
    /// Literal/length symbol 286 or 287.
    #[error("reserved literal/length symbol {0}")]
    ReservedLengthSymbol(u16),
    /// Distance symbol not defined for the active variant.
    #[error("reserved distance symbol {0}")]
    ReservedDistanceSymbol(u16),
    /// Back-reference points before the start of the output or beyond the window.
    #[error("back-reference distance {distance} exceeds available history {available}")]
    DistanceTooFar {
        /// Requested distance.
        distance: u32,
        /// Bytes of history that were available.
        available: u32,
    },
}
