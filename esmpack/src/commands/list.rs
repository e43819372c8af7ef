use esmpack_format::BundleReader;

use crate::cli::ListArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, format_time};

pub async fn run(args: ListArgs) -> Result<()> {
    let reader = BundleReader::open_path(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;

    if args.json {
        list_json(&reader)
    } else if args.long {
        list_long(&reader)
    } else {
        list_compact(&reader)
    }
}

fn list_compact(reader: &BundleReader) -> Result<()> {
    println!("{:>12}  Name", "Size");
    println!("{}", "-".repeat(40));

    for entry in reader.entries() {
        println!("{:>12}  {}", format_size(entry.size), entry.name);
    }

    println!("{}", "-".repeat(40));
    println!(
        "{:>12}  Total ({} entries)",
        format_size(reader.content_len() as u64),
        reader.len()
    );

    Ok(())
}

fn list_long(reader: &BundleReader) -> Result<()> {
    println!(
        "Archive: {} entries, {} (checksum {:08x})",
        reader.len(),
        format_size(reader.as_bytes().len() as u64),
        reader.checksum()
    );
    println!();
    println!("{:>12}  {:20}  {:24}  Name", "Size", "Modified", "Type");
    println!("{}", "-".repeat(80));

    for entry in reader.entries() {
        let content_type = if entry.content_type.is_empty() {
            "-"
        } else {
            entry.content_type.as_str()
        };
        println!(
            "{:>12}  {:20}  {:24}  {}",
            format_size(entry.size),
            format_time(entry.last_modified),
            content_type,
            entry.name
        );
    }

    Ok(())
}

fn list_json(reader: &BundleReader) -> Result<()> {
    let entries: Vec<_> = reader.entries().collect();
    let json = serde_json::to_string_pretty(&entries).map_err(|source| Error::Json { source })?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use esmpack_format::{bundle, BundleEntry};

    use super::*;

    fn write_archive(dir: &std::path::Path) -> std::path::PathBuf {
        let archive = dir.join("app.esma");
        let buf = bundle(vec![
            BundleEntry::new("index.js", "text/javascript", 1_700_000_000_000, "main()"),
            BundleEntry::new("data.bin", "", 0, vec![0u8; 16]),
        ])
        .unwrap();
        std::fs::write(&archive, buf).unwrap();
        archive
    }

    #[tokio::test]
    async fn lists_in_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path());

        for (long, json) in [(false, false), (true, false), (false, true)] {
            run(ListArgs {
                archive: archive.clone(),
                long,
                json,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(ListArgs {
            archive: dir.path().join("missing.esma"),
            long: false,
            json: false,
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::OpenArchive {
                source: esmpack_format::OpenError::ReadFailed(..),
                ..
            }
        ));
    }
}
