use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::CompressionEngine;
use crate::error::CodecError;
use crate::format::{RecordHeader, COMPRESSION_HEADROOM, DEFAULT_POOL_CAPACITY};
use crate::io::{Available, DataInput};
use crate::pool::BufferPool;
use crate::value::ValueCodec;

/// Result of one compression attempt on an encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome<'b> {
    /// The compressed bytes, strictly shorter than the input.
    Effective(&'b [u8]),
    /// The engine failed or did not shrink the input.
    Ineffective,
}

/// Wraps a [`ValueCodec`] so that its output is block-compressed.
///
/// # Record layout
/// ```text
/// flag:varint [compressed_len:varint] payload
/// ```
/// `flag == 0` marks the inner codec's bytes stored verbatim, used whenever
/// compression would not make the record smaller. Otherwise `flag - 1` is
/// the uncompressed length and the payload is the engine's output.
///
/// # Framing modes
/// Without self-describing length the compressed payload extends to the end
/// of the bounded availability hint, so the caller must know each record's
/// size. With it, `compressed_len` is stored and records can be read back
/// to back from an unbounded input.
///
/// Scratch buffers come from a pool owned by the codec. The pool is not part
/// of the serialized configuration; a codec restored through serde builds a
/// fresh one on first use.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompressingCodec<C, E> {
    inner: C,
    engine: E,
    self_describing: bool,
    #[serde(default = "default_pool_capacity")]
    pool_capacity: usize,
    #[serde(skip)]
    pool: OnceLock<BufferPool>,
}

fn default_pool_capacity() -> usize {
    DEFAULT_POOL_CAPACITY
}

impl<C, E> CompressingCodec<C, E> {
    /// Wrap `inner` with the default pool size. Use [`builder`](Self::builder)
    /// to request unbounded reads, which are validated up front.
    pub fn new(inner: C, engine: E, self_describing: bool) -> Self {
        Self {
            inner,
            engine,
            self_describing,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            pool: OnceLock::new(),
        }
    }

    pub fn builder(inner: C, engine: E) -> CompressingCodecBuilder<C, E> {
        CompressingCodecBuilder {
            inner,
            engine,
            self_describing: false,
            unbounded_reads: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Whether records carry their compressed payload length.
    pub fn is_self_describing(&self) -> bool {
        self.self_describing
    }

    /// The scratch buffer pool, created on first access.
    pub fn pool(&self) -> &BufferPool {
        self.pool.get_or_init(|| {
            debug!(capacity = self.pool_capacity, "initializing codec buffer pool");
            BufferPool::new(self.pool_capacity)
        })
    }
}

impl<C, E: CompressionEngine> CompressingCodec<C, E> {
    /// Compress `raw` into `dst`, folding engine errors into
    /// [`CompressionOutcome::Ineffective`].
    pub fn try_compress<'b>(&self, raw: &[u8], dst: &'b mut Vec<u8>) -> CompressionOutcome<'b> {
        dst.clear();
        match self.engine.compress(raw, dst) {
            Ok(()) if dst.len() < raw.len() => CompressionOutcome::Effective(dst.as_slice()),
            Ok(()) => {
                trace!(
                    engine = self.engine.name(),
                    raw_len = raw.len(),
                    compressed_len = dst.len(),
                    "compression did not shrink record"
                );
                CompressionOutcome::Ineffective
            }
            Err(err) => {
                debug!(
                    engine = self.engine.name(),
                    raw_len = raw.len(),
                    error = %err,
                    "compression failed, storing record uncompressed"
                );
                CompressionOutcome::Ineffective
            }
        }
    }
}

impl<C, E> ValueCodec for CompressingCodec<C, E>
where
    C: ValueCodec,
    E: CompressionEngine,
{
    type Value = C::Value;

    fn encode(&self, value: &C::Value, out: &mut Vec<u8>) -> anyhow::Result<()> {
        let pool = self.pool();
        let mut raw = pool.acquire();
        self.inner.encode(value, &mut raw)?;

        let mut packed = pool.acquire_with_capacity(raw.len() + COMPRESSION_HEADROOM);
        match self.try_compress(&raw, &mut packed) {
            CompressionOutcome::Effective(payload) => {
                let header = RecordHeader::Compressed {
                    raw_len: raw.len(),
                    compressed_len: self.self_describing.then_some(payload.len()),
                };
                out.reserve(header.encoded_len() + payload.len());
                header.write_to(out);
                out.extend_from_slice(payload);
            }
            CompressionOutcome::Ineffective => {
                out.reserve(1 + raw.len());
                RecordHeader::Raw.write_to(out);
                out.extend_from_slice(&raw);
            }
        }
        Ok(())
    }

    fn decode(&self, input: &mut DataInput<'_>, available: Available) -> anyhow::Result<C::Value> {
        let start = input.position();
        let header = RecordHeader::read_from(input, self.self_describing)?;
        let header_len = input.position() - start;

        let (raw_len, compressed_len) = match header {
            RecordHeader::Raw => {
                let available = available.after(header_len, start)?;
                return self.inner.decode(input, available);
            }
            RecordHeader::Compressed {
                raw_len,
                compressed_len,
            } => (raw_len, compressed_len),
        };

        let payload_len = match (compressed_len, available.after(header_len, start)?) {
            (Some(len), Available::Bounded(n)) if len > n => {
                return Err(CodecError::Corrupt {
                    offset: start,
                    reason: format!(
                        "stored payload length {len} overruns the {n} bytes left in the record"
                    ),
                }
                .into());
            }
            (Some(len), _) => len,
            (None, Available::Bounded(n)) => n,
            (None, Available::Unbounded) => return Err(CodecError::UnboundedWithoutLength.into()),
        };
        let payload = input.take(payload_len)?;
        trace!(offset = start, raw_len, payload_len, "decompressing record");

        let mut buf = self.pool().acquire();
        buf.try_reserve(raw_len).map_err(|_| CodecError::Corrupt {
            offset: start,
            reason: format!("cannot allocate declared uncompressed length {raw_len}"),
        })?;
        self.engine
            .decompress(payload, &mut buf, raw_len)
            .map_err(|err| CodecError::Decompress {
                offset: start,
                engine: self.engine.name(),
                reason: format!("{err:#}"),
            })?;
        if buf.len() != raw_len {
            return Err(CodecError::Corrupt {
                offset: start,
                reason: format!(
                    "decompressed to {} bytes but header declares {raw_len}",
                    buf.len()
                ),
            }
            .into());
        }

        let mut unpacked = DataInput::new(&buf);
        let value = self.inner.decode(&mut unpacked, Available::Bounded(raw_len))?;
        Ok(value)
    }
}

impl<C: Clone, E: Clone> Clone for CompressingCodec<C, E> {
    /// The clone shares configuration but starts with its own empty pool.
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            engine: self.engine.clone(),
            self_describing: self.self_describing,
            pool_capacity: self.pool_capacity,
            pool: OnceLock::new(),
        }
    }
}

/// Configures a [`CompressingCodec`], rejecting framing combinations that
/// could not be read back.
#[derive(Debug)]
pub struct CompressingCodecBuilder<C, E> {
    inner: C,
    engine: E,
    self_describing: bool,
    unbounded_reads: bool,
    pool_capacity: usize,
}

impl<C, E> CompressingCodecBuilder<C, E> {
    /// Store the compressed payload length in every compressed record.
    pub fn self_describing(mut self, enabled: bool) -> Self {
        self.self_describing = enabled;
        self
    }

    /// Declare that records will be decoded with [`Available::Unbounded`].
    /// Requires self-describing length.
    pub fn unbounded_reads(mut self, enabled: bool) -> Self {
        self.unbounded_reads = enabled;
        self
    }

    /// Upper bound on idle scratch buffers kept between calls.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<CompressingCodec<C, E>, CodecError> {
        if self.unbounded_reads && !self.self_describing {
            return Err(CodecError::UnboundedWithoutLength);
        }
        Ok(CompressingCodec {
            inner: self.inner,
            engine: self.engine,
            self_describing: self.self_describing,
            pool_capacity: self.pool_capacity,
            pool: OnceLock::new(),
        })
    }
}
