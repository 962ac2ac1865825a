pub mod compressing;
pub mod engine;
pub mod error;
pub mod format;
pub mod io;
pub mod pool;
pub mod reader;
pub mod value;
pub mod writer;

pub use compressing::{CompressingCodec, CompressingCodecBuilder, CompressionOutcome};
pub use engine::CompressionEngine;
pub use error::CodecError;
pub use format::{LogHeader, RecordHeader, COMPRESSION_HEADROOM, LOG_MAGIC};
pub use io::{Available, DataInput};
pub use pool::{BufferPool, PooledBuffer};
pub use reader::{peek_header, Reader, RecordEntry, Records};
pub use value::{RawBytesCodec, U64Codec, Utf8Codec, ValueCodec};
pub use writer::Writer;
