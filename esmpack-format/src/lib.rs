//! Herein lies the brains of the `esm-archive` bundle format.
//!
//! Use [BundleWriter] (or [bundle]) to pack entries that are already in memory,
//! [aio::bundle_lazy] when entry bytes still have to be read, and [BundleReader]
//! to open a packed buffer and look entries up by name.

#[cfg(feature = "writer")]
pub mod aio;
pub mod checksum;
pub mod header;
#[cfg(feature = "reader")]
pub mod parse;
#[cfg(feature = "reader")]
mod reader;
mod record;
#[cfg(feature = "writer")]
mod ser;
#[cfg(feature = "writer")]
mod writer;

pub use checksum::{checksum, Checksum};
pub use header::{FILE_EXTENSION, MEDIA_TYPE};
#[cfg(feature = "reader")]
pub use parse::ParseError;
#[cfg(feature = "reader")]
pub use reader::{BundleFile, BundleReader, EntryNotFound, OpenError};
pub use record::Entry;
#[cfg(feature = "writer")]
pub use writer::{bundle, BuildError, BundleEntry, BundleWriter};
