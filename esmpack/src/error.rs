use std::path::PathBuf;

use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot name an entry after path `{}`", .path.display())]
    #[diagnostic(help("Paths must be relative and must not contain `..`"))]
    InvalidPath { path: PathBuf },

    #[error("Cannot open archive `{}`", .path.display())]
    #[diagnostic(help("Is this a valid esm-archive bundle?"))]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: esmpack_format::OpenError,
    },

    #[error("Cannot process directory entry")]
    ProcessDirEntry {
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot process file `{}`", .path.display())]
    ProcessFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot canonicalize path `{}`", .path.display())]
    CanonicalizePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build archive")]
    Build {
        #[source]
        source: esmpack_format::BuildError,
    },

    #[error("Cannot write archive `{}`", .path.display())]
    WriteArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive already exists: `{}`", path.display())]
    #[diagnostic(help("Use -f/--force to overwrite"))]
    ArchiveExists { path: PathBuf },

    #[error("No files found to add to archive")]
    #[diagnostic(help("Use -r/--recursive to bundle the contents of directories"))]
    NoFilesFound,

    #[error("Cannot find entry")]
    #[diagnostic(help("Use `esmpack list` to see the entries in the archive"))]
    EntryNotFound {
        #[source]
        source: esmpack_format::EntryNotFound,
    },

    #[error("Refusing to extract entry `{name}` outside the output directory")]
    UnsafeEntryName { name: String },

    #[error("Entries `{first}` and `{second}` clash when extracted")]
    #[diagnostic(help("Both land on the same path, or one would need to be a directory for the other; extract them separately"))]
    ConflictingEntryNames { first: String, second: String },

    #[error("Cannot serialize entry list")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}
