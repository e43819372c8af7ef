use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_walkdir::WalkDir;
use esmpack_format::aio::{bundle_lazy, bundle_lazy_parallel, LazyEntry, LazyOptions, PathSource, ReadProgress};
use futures::StreamExt;
use indicatif::ProgressBar;

use crate::cli::CreateArgs;
use crate::error::{Error, Result};
use crate::util::{
    create_progress_bar, create_spinner, entry_name, format_size, guess_media_type, is_hidden,
    modified_millis,
};

struct CollectedFile {
    fs_path: PathBuf,
    name: String,
    meta: std::fs::Metadata,
}

pub async fn run(args: CreateArgs) -> Result<()> {
    let archive_path = &args.archive;

    if archive_path.exists() && !args.force {
        return Err(Error::ArchiveExists {
            path: archive_path.clone(),
        });
    }

    let archive_canonical = canonical_archive_path(archive_path).await?;
    let archive_filename = archive_canonical.file_name();

    let spinner = if args.quiet {
        None
    } else {
        Some(create_spinner("Collecting files..."))
    };

    let mut files = Vec::new();
    let mut known_names = HashSet::new();
    for path in &args.paths {
        let candidates = collect_path(path, args.recursive, args.include_hidden).await?;

        for (fs_path, meta) in candidates {
            // Quick filename check before expensive canonicalize
            if fs_path.file_name() == archive_filename {
                let canonical_path = tokio::fs::canonicalize(&fs_path)
                    .await
                    .map_err(|source| Error::CanonicalizePath {
                        path: fs_path.clone(),
                        source,
                    })?;
                if canonical_path == archive_canonical {
                    continue;
                }
            }

            let name = entry_name(&fs_path).ok_or_else(|| Error::InvalidPath {
                path: fs_path.clone(),
            })?;

            if known_names.insert(name.clone()) {
                files.push(CollectedFile {
                    fs_path,
                    name,
                    meta,
                });
            }
        }
    }

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if files.is_empty() {
        return Err(Error::NoFilesFound);
    }

    let content_bytes: u64 = files.iter().map(|f| f.meta.len()).sum();
    let entries: Vec<_> = files
        .into_iter()
        .map(|f| {
            let content_type = guess_media_type(&f.name);
            let last_modified = modified_millis(&f.meta);
            LazyEntry::new(f.name, content_type, last_modified, PathSource(f.fs_path))
        })
        .collect();
    let entry_count = entries.len();

    tracing::debug!(entries = entry_count, bytes = content_bytes, "collected files");

    let buf = if args.serial {
        bundle_lazy(entries).await
    } else {
        let options = match args.jobs {
            Some(concurrency) => LazyOptions { concurrency },
            None => LazyOptions::default(),
        };
        read_parallel(entries, &options, args.quiet).await
    }
    .map_err(|source| Error::Build { source })?;

    tokio::fs::write(archive_path, &buf)
        .await
        .map_err(|source| Error::WriteArchive {
            path: archive_path.clone(),
            source,
        })?;

    if !args.quiet {
        let mut trailer = [0u8; 4];
        trailer.copy_from_slice(&buf[buf.len() - 4..]);
        println!(
            "Created {}: {} entries, {} ({} content), checksum {:08x}",
            archive_path.display(),
            entry_count,
            format_size(buf.len() as u64),
            format_size(content_bytes),
            u32::from_le_bytes(trailer)
        );
    }

    Ok(())
}

async fn read_parallel(
    entries: Vec<LazyEntry<PathSource>>,
    options: &LazyOptions,
    quiet: bool,
) -> std::result::Result<Vec<u8>, esmpack_format::BuildError> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<ReadProgress>();

    let progress_task = tokio::spawn(async move {
        let mut progress_bar: Option<ProgressBar> = None;

        while let Some(update) = progress_rx.recv().await {
            match update {
                ReadProgress::Started { total_entries } => {
                    if !quiet {
                        progress_bar = Some(create_progress_bar(total_entries, "Reading"));
                    }
                }
                ReadProgress::Reading { .. } => {}
                ReadProgress::Read { entries_read, .. } => {
                    if let Some(ref pb) = progress_bar {
                        pb.set_position(entries_read);
                    }
                }
                ReadProgress::Finished => {
                    if let Some(pb) = progress_bar.take() {
                        pb.finish_and_clear();
                    }
                }
            }
        }

        // Sender dropped early on failure
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }
    });

    let result = bundle_lazy_parallel(entries, options, Some(progress_tx)).await;
    let _ = progress_task.await;
    result
}

/// The archive's canonical path, which need not exist yet.
async fn canonical_archive_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return tokio::fs::canonicalize(path)
            .await
            .map_err(|source| Error::CanonicalizePath {
                path: path.to_path_buf(),
                source,
            });
    }

    let file_name = path.file_name().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let parent = tokio::fs::canonicalize(parent)
        .await
        .map_err(|source| Error::CanonicalizePath {
            path: parent.to_path_buf(),
            source,
        })?;
    Ok(parent.join(file_name))
}

/// Regular files under `path`, sorted by path so archives are reproducible.
async fn collect_path(
    path: &Path,
    recursive: bool,
    include_hidden: bool,
) -> Result<Vec<(PathBuf, std::fs::Metadata)>> {
    let path_meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| Error::ProcessFile {
            path: path.to_path_buf(),
            source,
        })?;

    if path_meta.is_file() {
        return Ok(vec![(path.to_path_buf(), path_meta)]);
    }

    let mut candidates = Vec::new();
    if recursive {
        let mut walker = WalkDir::new(path);
        while let Some(entry) = walker.next().await {
            let entry = entry.map_err(|e| Error::ProcessDirEntry { source: e.into() })?;
            candidates.push(entry.path());
        }
    } else {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|source| Error::ProcessFile {
                path: path.to_path_buf(),
                source,
            })?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|source| Error::ProcessDirEntry { source })?
        {
            candidates.push(entry.path());
        }
    }

    candidates.sort();

    let mut files = Vec::with_capacity(candidates.len());
    for file_path in candidates {
        if !include_hidden && is_hidden(path, &file_path) {
            continue;
        }

        // Follows symlinks; anything that is not a regular file in the end is skipped
        let meta = tokio::fs::metadata(&file_path)
            .await
            .map_err(|source| Error::ProcessFile {
                path: file_path.clone(),
                source,
            })?;
        if meta.is_file() {
            files.push((file_path, meta));
        }
    }

    Ok(files)
}
