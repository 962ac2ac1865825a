use std::sync::Arc;

/// One-shot block compression backend.
///
/// Each `CompressionEngine` implementation:
/// - Is identified by a stable numeric `id()` stored in record log headers.
/// - Compresses and decompresses whole buffers with no state carried between
///   calls, so one engine can serve any number of threads at once.
/// - Appends its output to the destination buffer, leaving any bytes already
///   there untouched.
pub trait CompressionEngine: Send + Sync {
    /// Stable engine ID.
    fn id(&self) -> u16;

    /// Human-readable engine name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Compress `src`, appending the compressed bytes to `dst`.
    ///
    /// Failure is not fatal to the caller: the record is stored uncompressed
    /// instead. An engine may therefore bail out early once it knows the
    /// output will not be smaller than the input.
    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()>;

    /// Decompress `src`, appending at most `capacity` bytes to `dst`.
    ///
    /// `capacity` is the uncompressed length recorded by the writer. Output
    /// that would exceed it must be reported as an error.
    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()>;
}

impl<E: CompressionEngine + ?Sized> CompressionEngine for Arc<E> {
    fn id(&self) -> u16 {
        (**self).id()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        (**self).compress(src, dst)
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        (**self).decompress(src, dst, capacity)
    }
}

impl<E: CompressionEngine + ?Sized> CompressionEngine for Box<E> {
    fn id(&self) -> u16 {
        (**self).id()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn compress(&self, src: &[u8], dst: &mut Vec<u8>) -> anyhow::Result<()> {
        (**self).compress(src, dst)
    }

    fn decompress(&self, src: &[u8], dst: &mut Vec<u8>, capacity: usize) -> anyhow::Result<()> {
        (**self).decompress(src, dst, capacity)
    }
}
