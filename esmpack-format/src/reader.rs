use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::checksum;
use crate::header::{BundleHeader, CHECKSUM_SIZE};
use crate::parse::{self, ParseError};
use crate::record::{Entry, EntryRecord};

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Invalid bundle (the data does not describe a valid esm-archive).")]
    InvalidArchive(#[from] ParseError),

    #[error("Checksum mismatch (stored {stored:#010x}, computed {computed:#010x}). The bundle is corrupt.")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Failed to read bundle file. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Entry not found in bundle. Name: '{0}'")]
pub struct EntryNotFound(pub String);

type Backing = Box<dyn AsRef<[u8]> + Send + Sync>;

struct Inner {
    data: Backing,
    checksum: u32,
    records: Vec<EntryRecord>,
    index: HashMap<String, usize>,
    content_start: usize,
    content_len: usize,
}

impl Inner {
    #[inline(always)]
    fn bytes(&self) -> &[u8] {
        (*self.data).as_ref()
    }

    #[inline(always)]
    fn content(&self, idx: usize) -> &[u8] {
        let record = &self.records[idx];
        // Bounds were checked against the content region at open time.
        let start = self.content_start + record.offset as usize;
        &self.bytes()[start..start + record.length() as usize]
    }
}

/// A validated, indexed view of a packed bundle.
///
/// Cloning is cheap: clones and every [`BundleFile`] handed out share the same
/// backing buffer, which is never modified.
#[derive(Clone)]
pub struct BundleReader {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BundleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleReader")
            .field("checksum", &format_args!("{:#010x}", self.inner.checksum))
            .field("entries", &self.inner.records.len())
            .field("content_len", &self.inner.content_len)
            .finish_non_exhaustive()
    }
}

/// Checks that no name repeats and that every entry's content lies inside the
/// content region, and builds the name index.
fn index_records(
    records: &[EntryRecord],
    content_len: usize,
) -> Result<HashMap<String, usize>, ParseError> {
    let mut index = HashMap::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        let end = record
            .offset
            .checked_add(record.length())
            .ok_or(ParseError::InvalidData("entry content offset overflows"))?;
        if end > content_len as u64 {
            return Err(ParseError::InvalidData("entry content out of bounds"));
        }

        if index.insert(record.name().to_string(), idx).is_some() {
            return Err(ParseError::InvalidData("duplicate entry name"));
        }
    }

    Ok(index)
}

impl BundleReader {
    /// Validate and index a packed bundle.
    ///
    /// Structure is checked first and the checksum last, so damage confined to
    /// entry content is always reported as [`OpenError::ChecksumMismatch`].
    pub fn open<B>(buf: B) -> Result<BundleReader, OpenError>
    where
        B: AsRef<[u8]> + Send + Sync + 'static,
    {
        let data: Backing = Box::new(buf);
        let bytes = (*data).as_ref();

        let min = BundleHeader::SIZE + CHECKSUM_SIZE;
        if bytes.len() < min {
            return Err(ParseError::NeedMoreBytes(min - bytes.len()).into());
        }

        let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);

        let (header, mut pos) = parse::parse_header(body)?;
        let (records, consumed) = parse::parse_table(&body[pos..], header.entry_count)?;
        pos += consumed;

        let content_start = pos;
        let content_len = body.len() - pos;
        let index = index_records(&records, content_len)?;

        let stored = LittleEndian::read_u32(trailer);
        let computed = checksum(body);
        if stored != computed {
            return Err(OpenError::ChecksumMismatch { stored, computed });
        }

        tracing::debug!(
            bytes = bytes.len(),
            entries = records.len(),
            content_start,
            content_len,
            checksum = format_args!("{:#010x}", stored),
            "opened bundle"
        );

        Ok(BundleReader {
            inner: Arc::new(Inner {
                data,
                checksum: stored,
                records,
                index,
                content_start,
                content_len,
            }),
        })
    }

    /// Memory-map a bundle file and open it.
    ///
    /// The file must not be modified while the reader (or any file view taken
    /// from it) is alive.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<BundleReader, OpenError> {
        let path = path.as_ref();
        let file =
            std::fs::File::open(path).map_err(|e| OpenError::ReadFailed(e, path.to_path_buf()))?;

        // Safety: the map is read-only, and callers must not mutate the file while it is open.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| OpenError::ReadFailed(e, path.to_path_buf()))?;

        BundleReader::open(mmap)
    }

    /// The stored (and verified) checksum.
    #[inline(always)]
    pub fn checksum(&self) -> u32 {
        self.inner.checksum
    }

    /// Entry metadata in insertion order. Never touches content.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &Entry> + '_ {
        self.inner.records.iter().map(|r| &r.entry)
    }

    #[inline(always)]
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.inner
            .index
            .get(name)
            .map(|&idx| &self.inner.records[idx].entry)
    }

    #[inline(always)]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Size of the content region, i.e. the sum of all entry sizes for bundles
    /// produced by this library.
    #[inline(always)]
    pub fn content_len(&self) -> usize {
        self.inner.content_len
    }

    /// The whole packed bundle, checksum included.
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.bytes()
    }

    /// Look an entry up by name. The returned file borrows nothing from `self`
    /// and copies no content.
    pub fn read_file(&self, name: &str) -> Result<BundleFile, EntryNotFound> {
        match self.inner.index.get(name) {
            Some(&idx) => Ok(BundleFile {
                inner: Arc::clone(&self.inner),
                idx,
            }),
            None => Err(EntryNotFound(name.to_string())),
        }
    }
}

/// A single entry: its metadata and a view of its bytes inside the bundle.
#[derive(Clone)]
pub struct BundleFile {
    inner: Arc<Inner>,
    idx: usize,
}

impl std::fmt::Debug for BundleFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleFile")
            .field("entry", self.entry())
            .finish_non_exhaustive()
    }
}

impl BundleFile {
    #[inline(always)]
    pub fn entry(&self) -> &Entry {
        &self.inner.records[self.idx].entry
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.entry().name
    }

    #[inline(always)]
    pub fn content_type(&self) -> &str {
        &self.entry().content_type
    }

    #[inline(always)]
    pub fn last_modified(&self) -> i64 {
        self.entry().last_modified
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.entry().size
    }

    /// The entry's bytes, borrowed from the bundle buffer.
    #[inline(always)]
    pub fn bytes(&self) -> &[u8] {
        self.inner.content(self.idx)
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.bytes())
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }
}

impl AsRef<[u8]> for BundleFile {
    fn as_ref(&self) -> &[u8] {
        self.bytes()
    }
}
