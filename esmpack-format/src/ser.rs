use std::io::{Result, Write};

use crate::header::BundleHeader;
use crate::record::EntryRecord;

/// Write a u16 in little-endian format
fn write_u16_le<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u32 in little-endian format
fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u64 in little-endian format
fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a `u16` length-prefixed string. Callers check the length beforehand.
fn write_str16<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    write_u16_le(writer, value.len() as u16)?;
    writer.write_all(value.as_bytes())
}

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for BundleHeader {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.magic_bytes)?;
        writer.write_all(&[self.version])?;
        writer.write_all(&[0u8; 3])?; // reserved
        write_u32_le(writer, self.entry_count)
    }
}

impl Serialize for EntryRecord {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_str16(writer, &self.entry.name)?;
        write_str16(writer, &self.entry.content_type)?;
        writer.write_all(&self.entry.last_modified.to_le_bytes())?;
        write_u64_le(writer, self.entry.size)?;
        write_u64_le(writer, self.offset)
    }
}
