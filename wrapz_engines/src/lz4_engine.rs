use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};
use serde::{Deserialize, Serialize};
use wrapz_core::format::ENGINE_LZ4;
use wrapz_core::CompressionEngine;

/// LZ4 block engine.
///
/// Raw LZ4 blocks with no size prefix: the record header already carries the
/// uncompressed length, so it is not stored twice. Fastest of the bundled
/// engines on both sides.
///
/// Best for: hot records, short values, latency-sensitive paths.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Lz4Engine;

impl CompressionEngine for Lz4Engine {
    fn id(&self) -> u16 {
        ENGINE_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        let start = dst.len();
        dst.resize(start + get_maximum_output_size(src.len()), 0);
        match compress_into(src, &mut dst[start..]) {
            Ok(written) => {
                dst.truncate(start + written);
                Ok(())
            }
            Err(e) => {
                dst.truncate(start);
                Err(anyhow::anyhow!("lz4 compress error: {}", e))
            }
        }
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        let start = dst.len();
        dst.resize(start + capacity, 0);
        match decompress_into(src, &mut dst[start..]) {
            Ok(written) => {
                dst.truncate(start + written);
                Ok(())
            }
            Err(e) => {
                dst.truncate(start);
                Err(anyhow::anyhow!("lz4 decompress error: {}", e))
            }
        }
    }
}
