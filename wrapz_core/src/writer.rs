use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::compressing::CompressingCodec;
use crate::engine::CompressionEngine;
use crate::format::{
    write_varint, LogHeader, FLAG_SELF_DESCRIBING, LOG_HEADER_SIZE, LOG_VERSION, MAX_VARINT_LEN,
};
use crate::value::ValueCodec;

/// Streaming writer for record log files.
///
/// # Format layout written
/// ```text
/// [HEADER: 16 bytes]
/// self-describing:  [RECORD 0][RECORD 1]...           ← read back unbounded
/// otherwise:        [len][RECORD 0][len][RECORD 1]... ← read back bounded by len
/// ```
/// Each record is one value framed by [`CompressingCodec`].
pub struct Writer<C> {
    out: BufWriter<File>,
    codec: CompressingCodec<C, Arc<dyn CompressionEngine>>,
    /// Reused encode target for one record.
    scratch: Vec<u8>,
    /// Reused length prefix for bounded logs.
    prefix: Vec<u8>,
    records: u64,
    compressed: u64,
    /// Bytes written so far, header included.
    offset: u64,
}

impl<C: ValueCodec> Writer<C> {
    /// Create a new record log at `path`, overwriting any existing file.
    pub fn create(
        path: impl AsRef<Path>,
        inner: C,
        engine: Arc<dyn CompressionEngine>,
        self_describing: bool,
    ) -> anyhow::Result<Self> {
        let header = LogHeader {
            version: LOG_VERSION,
            engine_id: engine.id(),
            flags: if self_describing { FLAG_SELF_DESCRIBING } else { 0 },
        };
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&header.to_bytes())?;
        Ok(Self {
            out,
            codec: CompressingCodec::new(inner, engine, self_describing),
            scratch: Vec::new(),
            prefix: Vec::with_capacity(MAX_VARINT_LEN),
            records: 0,
            compressed: 0,
            offset: LOG_HEADER_SIZE as u64,
        })
    }

    /// Encode `value` and append it as the next record.
    pub fn write(&mut self, value: &C::Value) -> anyhow::Result<()> {
        self.scratch.clear();
        self.codec.encode(value, &mut self.scratch)?;
        if !self.codec.is_self_describing() {
            self.prefix.clear();
            write_varint(&mut self.prefix, self.scratch.len() as u64);
            self.out.write_all(&self.prefix)?;
            self.offset += self.prefix.len() as u64;
        }
        if self.scratch.first().is_some_and(|&flag| flag != 0) {
            self.compressed += 1;
        }
        self.out.write_all(&self.scratch)?;
        self.offset += self.scratch.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far that were stored compressed.
    pub fn compressed_records(&self) -> u64 {
        self.compressed
    }

    /// Flush buffered output and close the file.
    ///
    /// Returns the number of records written.
    pub fn finish(mut self) -> anyhow::Result<u64> {
        self.out.flush()?;
        tracing::debug!(
            records = self.records,
            compressed = self.compressed,
            bytes = self.offset,
            "record log finished"
        );
        Ok(self.records)
    }
}
