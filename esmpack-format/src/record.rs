use serde::Serialize;

/// Metadata of a single packed entry. Content is never part of this view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique, case-sensitive name. Separators carry no meaning; the namespace is flat.
    pub name: String,

    /// Free-form type of the content, usually a media type.
    #[serde(rename = "type")]
    pub content_type: String,

    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,

    /// The exact length of the stored content.
    pub size: u64,
}

/// One row of the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryRecord {
    pub(crate) entry: Entry,

    /// Position of the content, relative to the start of the content region.
    pub(crate) offset: u64,
}

impl EntryRecord {
    /// Two length prefixes, last modified, length and offset.
    pub(crate) const MIN_SIZE: usize = 2 + 2 + 8 + 8 + 8;

    #[inline(always)]
    pub(crate) fn encoded_len(&self) -> usize {
        Self::MIN_SIZE + self.entry.name.len() + self.entry.content_type.len()
    }

    #[inline(always)]
    pub(crate) fn name(&self) -> &str {
        &self.entry.name
    }

    #[inline(always)]
    pub(crate) fn length(&self) -> u64 {
        self.entry.size
    }
}
