use esmpack_format::{BundleReader, Entry, MEDIA_TYPE};

use crate::cli::InfoArgs;
use crate::error::{Error, Result};
use crate::util::{format_size, format_time};

pub async fn run(args: InfoArgs) -> Result<()> {
    let reader = BundleReader::open_path(&args.archive).map_err(|source| Error::OpenArchive {
        path: args.archive.clone(),
        source,
    })?;

    // If an entry name is provided, show info for that entry
    if let Some(name) = args.name {
        let file = reader
            .read_file(&name)
            .map_err(|source| Error::EntryNotFound { source })?;
        print_entry(file.entry());
        return Ok(());
    }

    println!("Archive:      {}", args.archive.display());
    println!("Media type:   {}", MEDIA_TYPE);
    println!("Checksum:     {:08x}", reader.checksum());
    println!("Entries:      {}", reader.len());
    println!(
        "Archive size: {} ({} bytes)",
        format_size(reader.as_bytes().len() as u64),
        reader.as_bytes().len()
    );
    println!(
        "Content size: {} ({} bytes)",
        format_size(reader.content_len() as u64),
        reader.content_len()
    );

    if let Some(latest) = reader.entries().map(|e| e.last_modified).max() {
        println!("Newest entry: {}", format_time(latest));
    }

    Ok(())
}

fn print_entry(entry: &Entry) {
    println!("Name:     {}", entry.name);
    println!(
        "Type:     {}",
        if entry.content_type.is_empty() {
            "-"
        } else {
            entry.content_type.as_str()
        }
    );
    println!("Size:     {} ({} bytes)", format_size(entry.size), entry.size);
    println!(
        "Modified: {} ({} ms)",
        format_time(entry.last_modified),
        entry.last_modified
    );
}
