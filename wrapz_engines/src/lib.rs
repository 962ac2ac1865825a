mod deflate_engine;
mod lz4_engine;
mod noop;
mod zstd_engine;

pub use deflate_engine::DeflateEngine;
pub use lz4_engine::Lz4Engine;
pub use noop::NoopEngine;
pub use zstd_engine::ZstdEngine;

use std::sync::Arc;
use wrapz_core::format::{ENGINE_DEFLATE, ENGINE_LZ4, ENGINE_NOOP, ENGINE_ZSTD};
use wrapz_core::CompressionEngine;

/// Resolve an engine from the `engine_id` stored in a record log header.
///
/// Called by the CLI when opening an existing log, so the reader can be
/// initialized with the right engine automatically. Levels are not stored
/// on disk; decompression does not need them.
pub fn engine_by_id(id: u16) -> anyhow::Result<Arc<dyn CompressionEngine>> {
    match id {
        ENGINE_NOOP => Ok(Arc::new(NoopEngine)),
        ENGINE_ZSTD => Ok(Arc::new(ZstdEngine::default())),
        ENGINE_LZ4 => Ok(Arc::new(Lz4Engine)),
        ENGINE_DEFLATE => Ok(Arc::new(DeflateEngine::default())),
        _ => anyhow::bail!(
            "unknown engine id {}; supported: 0 (noop), 1 (zstd), 2 (lz4), 3 (deflate)",
            id
        ),
    }
}
