use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use wrapz_core::format::ENGINE_DEFLATE;
use wrapz_core::CompressionEngine;

/// Raw DEFLATE engine (no zlib or gzip wrapper).
///
/// Slower than lz4 and zstd; useful where records must be readable by
/// tooling that only speaks deflate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeflateEngine {
    /// Compression level, 0 (store) to 9 (best).
    pub level: u32,
}

impl Default for DeflateEngine {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateEngine {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

impl CompressionEngine for DeflateEngine {
    fn id(&self) -> u16 {
        ENGINE_DEFLATE
    }

    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        let mut encoder = DeflateEncoder::new(dst, Compression::new(self.level));
        encoder.write_all(src)?;
        encoder.finish()?;
        Ok(())
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        let start = dst.len();
        // One byte past the capacity is enough to detect an oversized stream.
        let mut decoder = DeflateDecoder::new(src).take(capacity as u64 + 1);
        decoder.read_to_end(dst)?;
        if dst.len() - start > capacity {
            dst.truncate(start);
            anyhow::bail!("deflate output exceeds declared length {}", capacity);
        }
        Ok(())
    }
}
