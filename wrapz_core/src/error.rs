use thiserror::Error;

/// Failures raised by the record framing layer.
///
/// Compression that does not pay off is never reported here; it silently
/// falls back to passthrough framing. Every variant below is unrecoverable
/// for the record it was raised on.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A compressed record was read with an unbounded availability hint by a
    /// codec that does not store the compressed length.
    #[error("unbounded reads require self-describing length framing")]
    UnboundedWithoutLength,

    #[error("truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("malformed varint at offset {offset}: {reason}")]
    Varint { offset: usize, reason: &'static str },

    #[error("record at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("record at offset {offset}: {engine} decompression failed: {reason}")]
    Decompress {
        offset: usize,
        engine: &'static str,
        reason: String,
    },
}

impl CodecError {
    /// Byte offset of the record (or field) the error was raised on, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodecError::UnboundedWithoutLength => None,
            CodecError::Truncated { offset, .. }
            | CodecError::Varint { offset, .. }
            | CodecError::Corrupt { offset, .. }
            | CodecError::Decompress { offset, .. } => Some(*offset),
        }
    }
}
