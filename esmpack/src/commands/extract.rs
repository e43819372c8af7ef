use std::collections::HashMap;
use std::path::{Path, PathBuf};

use esmpack_format::{BundleFile, BundleReader};

use crate::cli::ExtractArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, output_path};

pub async fn run(args: ExtractArgs) -> Result<()> {
    let reader = BundleReader::open_path(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;

    let output = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|source| Error::ProcessFile {
            path: ".".into(),
            source,
        })?,
    };

    let files = select(&reader, &args.names)?;
    let targets = plan(files, &output)?;

    let mut bytes = 0u64;
    for (file, target) in targets.iter() {
        write_file(file, target).await?;
        bytes += file.size();
    }

    if !args.quiet {
        println!(
            "Extracted {} entries ({}) to {}",
            targets.len(),
            format_size(bytes),
            output.display()
        );
    }

    Ok(())
}

/// Map entries to paths under `output`, rejecting every unsafe or clashing name
/// before anything is written.
///
/// Distinct names can share a path (`a.js` and `./a.js`), and one entry's path
/// can be a parent directory of another's (`lib` and `lib/x.js`).
fn plan(files: Vec<BundleFile>, output: &Path) -> Result<Vec<(BundleFile, PathBuf)>> {
    let mut targets = Vec::with_capacity(files.len());
    let mut owners: HashMap<PathBuf, String> = HashMap::with_capacity(files.len());

    for file in files {
        let target = output_path(output, file.name()).ok_or_else(|| Error::UnsafeEntryName {
            name: file.name().to_string(),
        })?;

        if let Some(first) = owners.insert(target.clone(), file.name().to_string()) {
            return Err(Error::ConflictingEntryNames {
                first,
                second: file.name().to_string(),
            });
        }
        targets.push((file, target));
    }

    for (file, target) in targets.iter() {
        let parents = target
            .ancestors()
            .skip(1)
            .take_while(|p| *p != output);
        for parent in parents {
            if let Some(first) = owners.get(parent) {
                return Err(Error::ConflictingEntryNames {
                    first: first.clone(),
                    second: file.name().to_string(),
                });
            }
        }
    }

    Ok(targets)
}

/// The named entries in the order given, or every entry in bundle order.
fn select(reader: &BundleReader, names: &[String]) -> Result<Vec<BundleFile>> {
    if names.is_empty() {
        return reader
            .entries()
            .map(|e| reader.read_file(&e.name))
            .collect::<std::result::Result<_, _>>()
            .map_err(|source| Error::EntryNotFound { source });
    }

    names
        .iter()
        .map(|name| {
            reader
                .read_file(name)
                .map_err(|source| Error::EntryNotFound { source })
        })
        .collect()
}

async fn write_file(file: &BundleFile, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::ProcessFile {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(target, file.bytes())
        .await
        .map_err(|source| Error::ProcessFile {
            path: target.to_path_buf(),
            source,
        })?;

    tracing::debug!(name = file.name(), bytes = file.size(), "extracted entry");
    Ok(())
}
