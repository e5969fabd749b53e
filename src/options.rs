//! Decoder configuration.

use crate::block::Variant;

/// Default size of the compressed-input buffer.
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 16 * 1024;

/// Options for constructing a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateOptions {
    /// Bitstream flavor to decode.
    pub variant: Variant,
    /// Bytes requested from the source per read (minimum 1).
    pub input_buffer_size: usize,
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self {
            variant: Variant::Deflate64,
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
        }
    }
}

impl InflateOptions {
    /// DEFLATE64 decoding (the default).
    pub fn deflate64() -> Self {
        Self::default()
    }

    /// Plain DEFLATE (RFC 1951) decoding.
    pub fn deflate() -> Self {
        Self {
            variant: Variant::Deflate,
            ..Self::default()
        }
    }

    /// Set the input buffer size; zero is treated as one.
    #[must_use]
    pub fn with_input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = size.max(1);
        self
    }

    /// Set the variant.
    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }
}
