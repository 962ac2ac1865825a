use serde::{Deserialize, Serialize};
use wrapz_core::format::ENGINE_NOOP;
use wrapz_core::CompressionEngine;

/// Engine that copies its input unchanged.
///
/// Its output is never smaller than the input, so every record written
/// with it takes the passthrough path. Useful for:
/// - Verifying the framing independently of any real compressor.
/// - Values that are already compressed (images, archives), where trying
///   another compressor only burns CPU.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NoopEngine;

impl CompressionEngine for NoopEngine {
    fn id(&self) -> u16 {
        ENGINE_NOOP
    }

    fn name(&self) -> &'static str {
        "noop"
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        dst.extend_from_slice(src);
        Ok(())
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        if src.len() > capacity {
            anyhow::bail!(
                "noop payload of {} bytes exceeds declared length {}",
                src.len(),
                capacity
            );
        }
        dst.extend_from_slice(src);
        Ok(())
    }
}
