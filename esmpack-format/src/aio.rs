//! Lazy-source bundling: entry bytes are read asynchronously (from files on
//! disk, async readers, ...) and then packed exactly like eager entries.
//!
//! Reads may complete in any order; the bundle always lists entries in the
//! order they were supplied.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::writer::{check_fields, BuildError, BundleEntry, BundleWriter};

/// Something that can produce an entry's bytes exactly once.
pub trait Source: Send + 'static {
    fn read_all(self) -> impl Future<Output = std::io::Result<Vec<u8>>> + Send;
}

impl Source for Vec<u8> {
    async fn read_all(self) -> std::io::Result<Vec<u8>> {
        Ok(self)
    }
}

/// A file on the host filesystem, read in full when the bundle is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSource(pub PathBuf);

impl Source for PathSource {
    async fn read_all(self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.0).await
    }
}

/// Any async reader, drained to the end.
#[derive(Debug)]
pub struct ReaderSource<R>(pub R);

impl<R> Source for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_all(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// An entry whose content has not been read yet.
#[derive(Debug, Clone)]
pub struct LazyEntry<S> {
    pub name: String,
    pub content_type: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
    pub source: S,
}

impl<S: Source> LazyEntry<S> {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        last_modified: i64,
        source: S,
    ) -> LazyEntry<S> {
        LazyEntry {
            name: name.into(),
            content_type: content_type.into(),
            last_modified,
            source,
        }
    }

    /// Read the source. A read failure is returned unchanged as the error's source.
    pub async fn resolve(self) -> Result<BundleEntry, BuildError> {
        let LazyEntry {
            name,
            content_type,
            last_modified,
            source,
        } = self;

        match source.read_all().await {
            Ok(content) => Ok(BundleEntry {
                name,
                content_type,
                last_modified,
                content,
            }),
            Err(source) => Err(BuildError::ReadSource { name, source }),
        }
    }
}

impl LazyEntry<PathSource> {
    /// An entry backed by a file, stamped with the file's modification time.
    pub async fn from_path<P: AsRef<Path>>(
        name: impl Into<String>,
        content_type: impl Into<String>,
        path: P,
    ) -> std::io::Result<LazyEntry<PathSource>> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path).await?;
        let last_modified = meta.modified().map(unix_millis).unwrap_or(0);

        Ok(LazyEntry::new(name, content_type, last_modified, PathSource(path)))
    }
}

/// Milliseconds since the Unix epoch, saturating at `i64::MAX`. Times before
/// the epoch are 0.
pub fn unix_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Rejects bad or duplicate names before any source is read.
fn check_entries<S>(entries: &[LazyEntry<S>]) -> Result<(), BuildError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        check_fields(&entry.name, &entry.content_type)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(BuildError::DuplicateName(entry.name.clone()));
        }
    }
    Ok(())
}

/// Read every source, one after the other, and pack the results.
pub async fn bundle_lazy<S, I>(entries: I) -> Result<Vec<u8>, BuildError>
where
    S: Source,
    I: IntoIterator<Item = LazyEntry<S>>,
{
    let entries: Vec<_> = entries.into_iter().collect();
    check_entries(&entries)?;

    let mut writer = BundleWriter::with_capacity(entries.len());
    for entry in entries {
        writer.insert(entry.resolve().await?)?;
    }
    writer.finish()
}

/// Options for [`bundle_lazy_parallel`].
#[derive(Debug, Clone)]
pub struct LazyOptions {
    /// Maximum number of sources read at the same time.
    pub concurrency: usize,
}

impl Default for LazyOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Progress updates from parallel source reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadProgress {
    /// Reading started.
    Started { total_entries: u64 },
    /// A source is being read.
    Reading { name: String },
    /// A source finished reading.
    Read {
        name: String,
        entries_read: u64,
        total_entries: u64,
    },
    /// All sources have been read.
    Finished,
}

/// Read sources concurrently on the tokio runtime, then pack them in call order.
///
/// At most `options.concurrency` sources are read at once. On the first failure
/// all outstanding reads are cancelled and the error is returned; nothing read
/// so far is kept.
pub async fn bundle_lazy_parallel<S, I>(
    entries: I,
    options: &LazyOptions,
    progress: Option<UnboundedSender<ReadProgress>>,
) -> Result<Vec<u8>, BuildError>
where
    S: Source,
    I: IntoIterator<Item = LazyEntry<S>>,
{
    let entries: Vec<_> = entries.into_iter().collect();
    check_entries(&entries)?;

    let total_entries = entries.len() as u64;
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    if let Some(ref p) = progress {
        let _ = p.send(ReadProgress::Started { total_entries });
    }

    for (idx, entry) in entries.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let progress = progress.clone();

        tasks.spawn(async move {
            // Hold the permit until the read completes
            let _permit = semaphore.acquire_owned().await;

            if let Some(ref p) = progress {
                let _ = p.send(ReadProgress::Reading {
                    name: entry.name.clone(),
                });
            }

            (idx, entry.resolve().await)
        });
    }

    // Completion order is arbitrary; slot results back into call order.
    let mut slots: Vec<Option<BundleEntry>> = std::iter::repeat_with(|| None)
        .take(total_entries as usize)
        .collect();
    let mut entries_read = 0;
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined.map_err(BuildError::TaskFailed)?;
        let entry = result?;
        entries_read += 1;

        if let Some(ref p) = progress {
            let _ = p.send(ReadProgress::Read {
                name: entry.name.clone(),
                entries_read,
                total_entries,
            });
        }

        slots[idx] = Some(entry);
    }

    let mut writer = BundleWriter::with_capacity(slots.len());
    for entry in slots.into_iter().flatten() {
        writer.insert(entry)?;
    }
    let buf = writer.finish()?;

    if let Some(ref p) = progress {
        let _ = p.send(ReadProgress::Finished);
    }

    Ok(buf)
}
