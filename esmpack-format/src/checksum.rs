//! The bundle checksum: xxHash32 over every byte preceding the checksum field.
//!
//! This detects accidental corruption and gives callers a cheap identity for a
//! bundle (e.g. as a cache key). It is not a defence against tampering.

use std::io::{Result, Write};

use xxhash_rust::xxh32::{xxh32, Xxh32};

/// Streaming checksum state.
pub struct Checksum(Xxh32);

impl Checksum {
    pub const SEED: u32 = 0;

    pub fn new() -> Self {
        Checksum(Xxh32::new(Self::SEED))
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    /// The digest of everything seen so far. Does not reset the state.
    #[inline]
    pub fn finish(&self) -> u32 {
        self.0.digest()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::new()
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Checksum({:#010x})", self.finish())
    }
}

/// One-shot checksum of a byte slice.
#[inline]
pub fn checksum(bytes: &[u8]) -> u32 {
    xxh32(bytes, Checksum::SEED)
}

/// A writer wrapper that checksums data while it is written through it.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Checksum,
    bytes_written: u64,
}

impl<W> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Checksum::new(),
            bytes_written: 0,
        }
    }

    /// Get the total number of bytes written through this writer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Get the inner writer back, along with the checksum of everything written.
    pub fn finish(self) -> (W, u32) {
        let sum = self.hasher.finish();
        (self.inner, sum)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.bytes_written += n as u64;
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
