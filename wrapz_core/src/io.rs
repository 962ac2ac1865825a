use crate::error::CodecError;
use crate::format::read_varint;

/// How many bytes of the input belong to the record being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Available {
    /// Exactly this many bytes, starting at the current position.
    Bounded(usize),
    /// The caller cannot bound the record; the codec must find its own end.
    Unbounded,
}

impl Available {
    /// Shrink a bounded hint by `consumed` bytes already read from the record.
    ///
    /// Fails when the hint is smaller than what has been consumed, which can
    /// only happen on a corrupt record or a mismatched hint.
    pub fn after(self, consumed: usize, offset: usize) -> Result<Self, CodecError> {
        match self {
            Available::Unbounded => Ok(Available::Unbounded),
            Available::Bounded(n) => n
                .checked_sub(consumed)
                .map(Available::Bounded)
                .ok_or_else(|| CodecError::Corrupt {
                    offset,
                    reason: format!(
                        "availability hint {n} is smaller than the {consumed} byte header"
                    ),
                }),
        }
    }
}

/// Cursor over an in-memory record buffer.
///
/// Reads hand out borrowed slices of the underlying buffer, so payloads can be
/// passed to a decompressor without an intermediate copy.
#[derive(Debug, Clone)]
pub struct DataInput<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DataInput<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading `buf` at `pos`, clamped to its length.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Borrow every byte up to the end of the buffer.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let (value, width) = read_varint(&self.buf[self.pos..]).map_err(|reason| {
            CodecError::Varint {
                offset: self.pos,
                reason,
            }
        })?;
        self.pos += width;
        Ok(value)
    }

    /// Read a varint that is used as an in-memory length.
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let offset = self.pos;
        let value = self.read_varint()?;
        usize::try_from(value).map_err(|_| CodecError::Varint {
            offset,
            reason: "length does not fit in usize",
        })
    }
}
