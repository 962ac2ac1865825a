use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::compressing::CompressingCodec;
use crate::engine::CompressionEngine;
use crate::format::{LogHeader, RecordHeader, FLAG_SELF_DESCRIBING, LOG_HEADER_SIZE, LOG_VERSION};
use crate::io::{Available, DataInput};
use crate::value::ValueCodec;

/// Read only the header of the record log at `path`.
pub fn peek_header(path: impl AsRef<Path>) -> anyhow::Result<LogHeader> {
    let mut buf = [0u8; LOG_HEADER_SIZE];
    File::open(path)?.read_exact(&mut buf)?;
    LogHeader::from_bytes(&buf)
}

/// Location and framing of one record inside a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub index: u64,
    /// File offset of the record header (past any length prefix).
    pub offset: usize,
    /// Bytes the record occupies, header included.
    pub len: usize,
    pub header: RecordHeader,
}

/// Reader for record log files written by [`Writer`](crate::Writer).
///
/// The whole file is loaded into memory once; records are decoded straight
/// out of that buffer so compressed payloads are never copied before
/// decompression.
pub struct Reader<C> {
    pub header: LogHeader,
    bytes: Vec<u8>,
    codec: CompressingCodec<C, Arc<dyn CompressionEngine>>,
}

impl<C: ValueCodec> Reader<C> {
    /// Open a record log.
    ///
    /// `engine` must match the `engine_id` stored in the file header. Use
    /// `wrapz_engines::engine_by_id` after [`peek_header`] when the engine is
    /// not known up front.
    pub fn open(
        path: impl AsRef<Path>,
        inner: C,
        engine: Arc<dyn CompressionEngine>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading record log {path:?}"))?;
        Self::from_bytes(bytes, inner, engine)
    }

    pub fn from_bytes(
        bytes: Vec<u8>,
        inner: C,
        engine: Arc<dyn CompressionEngine>,
    ) -> anyhow::Result<Self> {
        let header = LogHeader::from_bytes(&bytes)?;
        if header.version != LOG_VERSION {
            anyhow::bail!(
                "unsupported record log version {} (only version {} is supported)",
                header.version,
                LOG_VERSION
            );
        }
        if header.engine_id != engine.id() {
            anyhow::bail!(
                "engine mismatch: file uses engine {} but provided engine {} has id {}",
                header.engine_id,
                engine.name(),
                engine.id()
            );
        }
        let self_describing = header.has_flag(FLAG_SELF_DESCRIBING);
        let codec = CompressingCodec::builder(inner, engine)
            .self_describing(self_describing)
            .unbounded_reads(self_describing)
            .build()?;
        Ok(Self { header, bytes, codec })
    }

    pub fn is_self_describing(&self) -> bool {
        self.codec.is_self_describing()
    }

    pub fn engine_name(&self) -> &'static str {
        self.codec.engine().name()
    }

    /// Size of the file in bytes, header included.
    pub fn file_size(&self) -> usize {
        self.bytes.len()
    }

    /// Iterate over records in file order, decoding each one.
    pub fn records(&self) -> Records<'_, C> {
        Records {
            reader: self,
            input: DataInput::at(&self.bytes, LOG_HEADER_SIZE),
            index: 0,
        }
    }

    /// Decode every record.
    pub fn read_all(&self) -> anyhow::Result<Vec<C::Value>> {
        self.records().map(|r| r.map(|(_, value)| value)).collect()
    }

    /// Framing details of every record, for inspection.
    pub fn entries(&self) -> anyhow::Result<Vec<RecordEntry>> {
        self.records().map(|r| r.map(|(entry, _)| entry)).collect()
    }
}

/// Iterator returned by [`Reader::records`].
pub struct Records<'r, C> {
    reader: &'r Reader<C>,
    input: DataInput<'r>,
    index: u64,
}

impl<C: ValueCodec> Records<'_, C> {
    fn next_record(&mut self) -> anyhow::Result<(RecordEntry, C::Value)> {
        let codec = &self.reader.codec;
        let (offset, len, value) = if codec.is_self_describing() {
            let offset = self.input.position();
            let value = codec.decode(&mut self.input, Available::Unbounded)?;
            (offset, self.input.position() - offset, value)
        } else {
            let len = self.input.read_len()?;
            let offset = self.input.position();
            let mut body = DataInput::new(self.input.take(len)?);
            let value = codec.decode(&mut body, Available::Bounded(len))?;
            if !body.is_empty() {
                anyhow::bail!("record left {} trailing bytes unread", body.remaining());
            }
            (offset, len, value)
        };

        let mut at = DataInput::new(&self.reader.bytes[offset..]);
        let header = RecordHeader::read_from(&mut at, codec.is_self_describing())?;
        let entry = RecordEntry {
            index: self.index,
            offset,
            len,
            header,
        };
        Ok((entry, value))
    }
}

impl<C: ValueCodec> Iterator for Records<'_, C> {
    type Item = anyhow::Result<(RecordEntry, C::Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.input.is_empty() {
            return None;
        }
        let start = self.input.position();
        let item = self
            .next_record()
            .with_context(|| format!("record {} at file offset {start}", self.index));
        if item.is_err() {
            // A malformed record leaves no reliable position for the next one.
            self.input.take_rest();
        }
        self.index += 1;
        Some(item)
    }
}
