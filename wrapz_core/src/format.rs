use crate::error::CodecError;
use crate::io::DataInput;

/// Extra bytes reserved past the raw length when sizing the compression
/// destination, covering the expansion of incompressible input.
pub const COMPRESSION_HEADROOM: usize = 40;

/// Default bound on idle buffers kept by a codec's pool.
pub const DEFAULT_POOL_CAPACITY: usize = 128;

/// Longest LEB128 encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

// ── Engine IDs ─────────────────────────────────────────────────────────────

pub const ENGINE_NOOP: u16 = 0;
pub const ENGINE_ZSTD: u16 = 1;
pub const ENGINE_LZ4: u16 = 2;
pub const ENGINE_DEFLATE: u16 = 3;

// ── Varint ─────────────────────────────────────────────────────────────────

/// Append `value` as an unsigned LEB128 varint (low 7-bit group first).
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes `write_varint` emits for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a varint from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), &'static str> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        let group = u64::from(byte & 0x7f);
        // The tenth byte may only contribute the single top bit.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err("varint overflows u64");
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err("varint overflows u64")
    } else {
        Err("truncated varint")
    }
}

// ── Record header ──────────────────────────────────────────────────────────

/// Decoded form of the header that precedes every record payload.
///
/// On the wire this is a single varint `flag`: zero for a raw payload,
/// otherwise the uncompressed length plus one, optionally followed by a
/// second varint holding the compressed payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordHeader {
    /// Payload is the inner codec's output, stored verbatim.
    Raw,
    Compressed {
        /// Length of the inner codec's output before compression.
        raw_len: usize,
        /// Exact compressed payload length; present only in self-describing mode.
        compressed_len: Option<usize>,
    },
}

impl RecordHeader {
    pub fn flag(&self) -> u64 {
        match self {
            RecordHeader::Raw => 0,
            RecordHeader::Compressed { raw_len, .. } => *raw_len as u64 + 1,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, RecordHeader::Compressed { .. })
    }

    /// Bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        let size_len = match self {
            RecordHeader::Compressed {
                compressed_len: Some(len),
                ..
            } => varint_len(*len as u64),
            _ => 0,
        };
        varint_len(self.flag()) + size_len
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        write_varint(out, self.flag());
        if let RecordHeader::Compressed {
            compressed_len: Some(len),
            ..
        } = self
        {
            write_varint(out, *len as u64);
        }
    }

    /// Read a header from `input`. The compressed length is only present on
    /// the wire when the writer ran in self-describing mode.
    pub fn read_from(input: &mut DataInput<'_>, self_describing: bool) -> Result<Self, CodecError> {
        let offset = input.position();
        let flag = input.read_varint()?;
        if flag == 0 {
            return Ok(RecordHeader::Raw);
        }
        let raw_len = usize::try_from(flag - 1).map_err(|_| CodecError::Corrupt {
            offset,
            reason: format!("declared uncompressed length {} does not fit in memory", flag - 1),
        })?;
        let compressed_len = if self_describing {
            Some(input.read_len()?)
        } else {
            None
        };
        Ok(RecordHeader::Compressed {
            raw_len,
            compressed_len,
        })
    }
}

// ── Record log file header ─────────────────────────────────────────────────

/// Magic bytes opening a record log file.
pub const LOG_MAGIC: &[u8; 8] = b"WRAPZLG1";

/// Fixed size of the record log header in bytes.
///   magic[8] + version:u16 + engine_id:u16 + flags:u16 + reserved[2] = 16
pub const LOG_HEADER_SIZE: usize = 16;

pub const LOG_VERSION: u16 = 1;

/// Records are written back to back in self-describing framing. When unset,
/// every record is preceded by a varint byte length instead.
pub const FLAG_SELF_DESCRIBING: u16 = 1 << 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    pub version: u16,
    pub engine_id: u16,
    pub flags: u16,
}

impl LogHeader {
    pub fn to_bytes(&self) -> [u8; LOG_HEADER_SIZE] {
        let mut buf = [0u8; LOG_HEADER_SIZE];
        buf[..8].copy_from_slice(LOG_MAGIC);
        buf[8..10].copy_from_slice(&self.version.to_le_bytes());
        buf[10..12].copy_from_slice(&self.engine_id.to_le_bytes());
        buf[12..14].copy_from_slice(&self.flags.to_le_bytes());
        // reserved[2] stays zero
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> anyhow::Result<Self> {
        if buf.len() < LOG_HEADER_SIZE {
            anyhow::bail!("file too short for a record log header ({} bytes)", buf.len());
        }
        if &buf[..8] != LOG_MAGIC {
            anyhow::bail!("invalid magic bytes: not a wrapz record log");
        }
        Ok(Self {
            version: u16::from_le_bytes(buf[8..10].try_into()?),
            engine_id: u16::from_le_bytes(buf[10..12].try_into()?),
            flags: u16::from_le_bytes(buf[12..14].try_into()?),
        })
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}
