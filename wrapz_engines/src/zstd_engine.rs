use std::io::Read;

use serde::{Deserialize, Serialize};
use wrapz_core::format::ENGINE_ZSTD;
use wrapz_core::CompressionEngine;

/// Zstandard engine.
///
/// Each record is one independent zstd frame at the configured level
/// (default: 3).
///
/// Best for: larger structured values (JSON, text, logs) where ratio
/// matters more than raw speed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZstdEngine {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdEngine {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdEngine {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl CompressionEngine for ZstdEngine {
    fn id(&self) -> u16 {
        ENGINE_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        zstd::stream::copy_encode(src, &mut *dst, self.level)?;
        Ok(())
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        let start = dst.len();
        // Output lands in dst directly; reading one byte past the declared
        // length is enough to reject a frame that claims more.
        let mut decoder = zstd::stream::read::Decoder::with_buffer(src)?.take(capacity as u64 + 1);
        decoder.read_to_end(dst)?;
        if dst.len() - start > capacity {
            dst.truncate(start);
            anyhow::bail!("zstd output exceeds declared length {}", capacity);
        }
        Ok(())
    }
}
