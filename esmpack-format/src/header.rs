//! Fixed-size header and trailer constants.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BundleHeader {
    pub(crate) magic_bytes: [u8; 4],
    pub(crate) version: u8,
    pub(crate) entry_count: u32,
}

impl BundleHeader {
    /// Magic (4), version (1), reserved (3), entry count (4).
    pub const SIZE: usize = 12;
}

// Make some attempt to not accidentally load plain text files,
// and also make it break almost immediately in any UTF-8 compliant text parser.
pub const MAGIC_BYTES: &[u8; 4] = b"\xffESM";
pub const VERSION: u8 = 1;

/// Size of the trailing xxHash32 checksum.
pub const CHECKSUM_SIZE: usize = 4;

/// The media type a packed bundle is served as.
pub const MEDIA_TYPE: &str = "application/esm-archive";
pub const FILE_EXTENSION: &str = "esma";

impl BundleHeader {
    pub(crate) fn new(entry_count: u32) -> BundleHeader {
        BundleHeader {
            magic_bytes: *MAGIC_BYTES,
            version: VERSION,
            entry_count,
        }
    }
}

impl Default for BundleHeader {
    fn default() -> Self {
        BundleHeader::new(0)
    }
}
