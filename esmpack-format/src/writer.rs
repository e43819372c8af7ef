use std::collections::HashSet;
use std::io::Write;

use crate::checksum::HashingWriter;
use crate::header::{BundleHeader, CHECKSUM_SIZE};
use crate::record::{Entry, EntryRecord};
use crate::ser::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Duplicate entry name. Name: '{0}'")]
    DuplicateName(String),

    #[error("Entry name must not be empty.")]
    EmptyName,

    #[error("Entry {field} is too long ({len} bytes, maximum is {max}).")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Too many entries for a single bundle.")]
    TooManyEntries,

    #[error("Reading entry source failed. Name: '{name}'")]
    ReadSource {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Writing bundle failed.")]
    Write(#[from] std::io::Error),

    #[error("Entry read task did not complete.")]
    TaskFailed(#[source] tokio::task::JoinError),
}

/// An entry whose content is already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub content_type: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
    pub content: Vec<u8>,
}

impl BundleEntry {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        last_modified: i64,
        content: impl Into<Vec<u8>>,
    ) -> BundleEntry {
        BundleEntry {
            name: name.into(),
            content_type: content_type.into(),
            last_modified,
            content: content.into(),
        }
    }
}

/// Checks everything about an entry's metadata that can be checked without its content.
pub(crate) fn check_fields(name: &str, content_type: &str) -> Result<(), BuildError> {
    const MAX: usize = u16::MAX as usize;

    if name.is_empty() {
        return Err(BuildError::EmptyName);
    }
    if name.len() > MAX {
        return Err(BuildError::FieldTooLong {
            field: "name",
            len: name.len(),
            max: MAX,
        });
    }
    if content_type.len() > MAX {
        return Err(BuildError::FieldTooLong {
            field: "type",
            len: content_type.len(),
            max: MAX,
        });
    }
    Ok(())
}

/// Accumulates entries in call order, then writes the whole bundle in one go.
///
/// Nothing is written until [`finish`](BundleWriter::finish) (or
/// [`finish_into`](BundleWriter::finish_into)), so a failed or abandoned build
/// never produces a partial bundle.
#[derive(Debug, Default)]
pub struct BundleWriter {
    records: Vec<EntryRecord>,
    contents: Vec<Vec<u8>>,
    names: HashSet<String>,
    next_offset: u64,
}

impl BundleWriter {
    pub fn new() -> BundleWriter {
        BundleWriter::default()
    }

    pub fn with_capacity(capacity: usize) -> BundleWriter {
        BundleWriter {
            records: Vec::with_capacity(capacity),
            contents: Vec::with_capacity(capacity),
            names: HashSet::with_capacity(capacity),
            next_offset: 0,
        }
    }

    /// Append an entry. Its content is placed directly after the previous entry's.
    pub fn insert(&mut self, entry: BundleEntry) -> Result<&Entry, BuildError> {
        check_fields(&entry.name, &entry.content_type)?;

        if self.records.len() >= u32::MAX as usize {
            return Err(BuildError::TooManyEntries);
        }

        // Check there isn't already a record for this name
        if self.names.contains(&entry.name) {
            return Err(BuildError::DuplicateName(entry.name));
        }

        let BundleEntry {
            name,
            content_type,
            last_modified,
            content,
        } = entry;

        let size = content.len() as u64;
        let record = EntryRecord {
            entry: Entry {
                name: name.clone(),
                content_type,
                last_modified,
                size,
            },
            offset: self.next_offset,
        };

        self.next_offset += size;
        self.names.insert(name);
        self.contents.push(content);
        self.records.push(record);

        Ok(&self.records[self.records.len() - 1].entry)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline(always)]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Metadata of the entries inserted so far, in insertion order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &Entry> + '_ {
        self.records.iter().map(|r| &r.entry)
    }

    /// The exact size of the finished bundle, saturating at `usize::MAX`.
    pub fn encoded_len(&self) -> usize {
        let content = usize::try_from(self.next_offset).unwrap_or(usize::MAX);
        self.records
            .iter()
            .fold(BundleHeader::SIZE + CHECKSUM_SIZE, |len, r| {
                len.saturating_add(r.encoded_len())
            })
            .saturating_add(content)
    }

    /// Write the bundle into a fresh buffer.
    pub fn finish(self) -> Result<Vec<u8>, BuildError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.finish_into(&mut out)?;
        Ok(out)
    }

    /// Write header, table, content and checksum, in that order. Returns the checksum.
    pub fn finish_into<W: Write>(self, writer: W) -> Result<u32, BuildError> {
        let mut writer = HashingWriter::new(writer);

        BundleHeader::new(self.records.len() as u32).write(&mut writer)?;
        for record in self.records.iter() {
            record.write(&mut writer)?;
        }
        for content in self.contents.iter() {
            writer.write_all(content)?;
        }

        let bytes = writer.bytes_written();
        let (mut writer, checksum) = writer.finish();
        writer.write_all(&checksum.to_le_bytes())?;
        writer.flush()?;

        tracing::debug!(
            entries = self.records.len(),
            bytes = bytes + CHECKSUM_SIZE as u64,
            checksum = format_args!("{:#010x}", checksum),
            "finished bundle"
        );

        Ok(checksum)
    }
}

/// Pack entries, in the order given, into a single bundle buffer.
pub fn bundle<I>(entries: I) -> Result<Vec<u8>, BuildError>
where
    I: IntoIterator<Item = BundleEntry>,
{
    let entries = entries.into_iter();
    let mut writer = BundleWriter::with_capacity(entries.size_hint().0);
    for entry in entries {
        writer.insert(entry)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    fn sample() -> Vec<BundleEntry> {
        vec![
            BundleEntry::new("x.txt", "text/plain", 1000, "hi"),
            BundleEntry::new("y.txt", "text/plain", 2000, "bye"),
        ]
    }

    #[test]
    fn empty_bundle() {
        let buf = bundle(Vec::<BundleEntry>::new()).unwrap();
        assert_eq!(buf.len(), BundleHeader::SIZE + CHECKSUM_SIZE);
        assert_eq!(&buf[..4], crate::header::MAGIC_BYTES);
        assert_eq!(&buf[8..12], &0u32.to_le_bytes());
    }

    #[test]
    fn layout() {
        let buf = bundle(sample()).unwrap();

        let writer = {
            let mut w = BundleWriter::new();
            for e in sample() {
                w.insert(e).unwrap();
            }
            w
        };
        assert_eq!(buf.len(), writer.encoded_len());

        // content region sits right before the checksum, in call order
        let body = &buf[..buf.len() - CHECKSUM_SIZE];
        assert!(body.ends_with(b"hibye"));

        let stored = u32::from_le_bytes(buf[buf.len() - 4..].try_into().unwrap());
        assert_eq!(stored, checksum(body));
    }

    #[test]
    fn offsets_are_cumulative() {
        let mut writer = BundleWriter::new();
        writer
            .insert(BundleEntry::new("a", "", 0, vec![0u8; 3]))
            .unwrap();
        writer
            .insert(BundleEntry::new("b", "", 0, vec![0u8; 0]))
            .unwrap();
        writer
            .insert(BundleEntry::new("c", "", 0, vec![0u8; 5]))
            .unwrap();

        let offsets: Vec<u64> = writer.records.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 3, 3]);
    }

    #[test]
    fn encoded_len_saturates() {
        let mut writer = BundleWriter::new();
        writer.insert(BundleEntry::new("a", "", 0, "1")).unwrap();
        writer.next_offset = u64::MAX;
        assert_eq!(writer.encoded_len(), usize::MAX);
    }

    #[test]
    fn deterministic() {
        let a = bundle(sample()).unwrap();
        let b = bundle(sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn finish_into_returns_checksum() {
        let mut writer = BundleWriter::new();
        for e in sample() {
            writer.insert(e).unwrap();
        }
        let mut out = Vec::new();
        let sum = writer.finish_into(&mut out).unwrap();
        assert_eq!(out, bundle(sample()).unwrap());
        assert_eq!(sum, checksum(&out[..out.len() - CHECKSUM_SIZE]));
    }

    #[test]
    fn rejects_duplicates() {
        let err = bundle(vec![
            BundleEntry::new("a", "text/plain", 0, "1"),
            BundleEntry::new("a", "text/plain", 0, "2"),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateName(name) if name == "a"));
    }

    #[test]
    fn names_are_case_sensitive() {
        let buf = bundle(vec![
            BundleEntry::new("A", "", 0, "1"),
            BundleEntry::new("a", "", 0, "2"),
        ]);
        assert!(buf.is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let mut writer = BundleWriter::new();
        assert!(matches!(
            writer.insert(BundleEntry::new("", "", 0, "")),
            Err(BuildError::EmptyName)
        ));

        let long = "n".repeat(u16::MAX as usize + 1);
        assert!(matches!(
            writer.insert(BundleEntry::new(long.clone(), "", 0, "")),
            Err(BuildError::FieldTooLong { field: "name", .. })
        ));
        assert!(matches!(
            writer.insert(BundleEntry::new("ok", long, 0, "")),
            Err(BuildError::FieldTooLong { field: "type", .. })
        ));

        assert!(writer.is_empty());
        assert!(!writer.contains("ok"));
    }

    #[test]
    fn failed_insert_leaves_writer_usable() {
        let mut writer = BundleWriter::new();
        writer.insert(BundleEntry::new("a", "", 0, "1")).unwrap();
        assert!(writer.insert(BundleEntry::new("a", "", 0, "2")).is_err());
        writer.insert(BundleEntry::new("b", "", 0, "3")).unwrap();

        let names: Vec<&str> = writer.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(writer.len(), 2);
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_errors_propagate() {
        let mut writer = BundleWriter::new();
        writer.insert(BundleEntry::new("a", "", 0, "1")).unwrap();
        assert!(matches!(
            writer.finish_into(FailingSink),
            Err(BuildError::Write(_))
        ));
    }
}
