//! Sans-IO parsing primitives for the bundle format.
//!
//! These functions work on byte slices without any I/O traits. All of them
//! return `(value, bytes_consumed)` on success, allowing the caller to manage
//! buffer positions.

use byteorder::{ByteOrder, LittleEndian};

use crate::header::{BundleHeader, MAGIC_BYTES, VERSION};
use crate::record::{Entry, EntryRecord};

/// Error type for parsing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Need more bytes to complete parsing. Contains minimum additional bytes needed.
    NeedMoreBytes(usize),
    /// Invalid data encountered.
    InvalidData(&'static str),
    /// Invalid UTF-8 in a name or type.
    InvalidUtf8,
    /// The buffer does not start with the bundle magic bytes.
    BadMagic([u8; 4]),
    /// The format version is not one this library understands.
    UnsupportedVersion(u8),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NeedMoreBytes(n) => write!(f, "need {} more bytes", n),
            ParseError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            ParseError::InvalidUtf8 => write!(f, "invalid UTF-8"),
            ParseError::BadMagic(bytes) => write!(f, "bad magic bytes: {:02x?}", bytes),
            ParseError::UnsupportedVersion(v) => write!(f, "unsupported version: {}", v),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for std::io::Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::NeedMoreBytes(_) => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e)
            }
            ParseError::InvalidData(_)
            | ParseError::InvalidUtf8
            | ParseError::BadMagic(_)
            | ParseError::UnsupportedVersion(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidData, e)
            }
        }
    }
}

pub type ParseResult<T> = Result<(T, usize), ParseError>;

#[inline]
fn need(data: &[u8], n: usize) -> Result<(), ParseError> {
    if data.len() < n {
        return Err(ParseError::NeedMoreBytes(n - data.len()));
    }
    Ok(())
}

/// Parse a single byte.
#[inline]
pub fn parse_u8(data: &[u8]) -> ParseResult<u8> {
    need(data, 1)?;
    Ok((data[0], 1))
}

/// Parse a little-endian u16.
#[inline]
pub fn parse_u16_le(data: &[u8]) -> ParseResult<u16> {
    need(data, 2)?;
    Ok((LittleEndian::read_u16(data), 2))
}

/// Parse a little-endian u32.
#[inline]
pub fn parse_u32_le(data: &[u8]) -> ParseResult<u32> {
    need(data, 4)?;
    Ok((LittleEndian::read_u32(data), 4))
}

/// Parse a little-endian u64.
#[inline]
pub fn parse_u64_le(data: &[u8]) -> ParseResult<u64> {
    need(data, 8)?;
    Ok((LittleEndian::read_u64(data), 8))
}

/// Parse a little-endian i64.
#[inline]
pub fn parse_i64_le(data: &[u8]) -> ParseResult<i64> {
    need(data, 8)?;
    Ok((LittleEndian::read_i64(data), 8))
}

/// Parse a `u16` length-prefixed UTF-8 string.
///
/// Returns the string slice and total bytes consumed (including length prefix).
pub fn parse_str16(data: &[u8]) -> ParseResult<&str> {
    let (len, prefix) = parse_u16_le(data)?;
    let total = prefix + len as usize;
    need(data, total)?;
    let s = std::str::from_utf8(&data[prefix..total]).map_err(|_| ParseError::InvalidUtf8)?;
    Ok((s, total))
}

/// Parse the 12-byte header.
pub(crate) fn parse_header(data: &[u8]) -> ParseResult<BundleHeader> {
    need(data, BundleHeader::SIZE)?;

    let mut magic_bytes = [0u8; 4];
    magic_bytes.copy_from_slice(&data[..4]);
    if &magic_bytes != MAGIC_BYTES {
        return Err(ParseError::BadMagic(magic_bytes));
    }

    let (version, _) = parse_u8(&data[4..])?;
    if version != VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }

    // bytes 5..8 are reserved
    let (entry_count, _) = parse_u32_le(&data[8..])?;

    Ok((
        BundleHeader {
            magic_bytes,
            version,
            entry_count,
        },
        BundleHeader::SIZE,
    ))
}

/// Parse one entry table record.
pub(crate) fn parse_record(data: &[u8]) -> ParseResult<EntryRecord> {
    let mut pos = 0;

    let (name, n) = parse_str16(data)?;
    pos += n;
    if name.is_empty() {
        return Err(ParseError::InvalidData("empty entry name"));
    }

    let (content_type, n) = parse_str16(&data[pos..])?;
    pos += n;
    let (last_modified, n) = parse_i64_le(&data[pos..])?;
    pos += n;
    let (length, n) = parse_u64_le(&data[pos..])?;
    pos += n;
    let (offset, n) = parse_u64_le(&data[pos..])?;
    pos += n;

    Ok((
        EntryRecord {
            entry: Entry {
                name: name.to_string(),
                content_type: content_type.to_string(),
                last_modified,
                size: length,
            },
            offset,
        },
        pos,
    ))
}

/// Parse `count` consecutive entry table records.
pub(crate) fn parse_table(data: &[u8], count: u32) -> ParseResult<Vec<EntryRecord>> {
    // Refuse counts that cannot possibly fit before allocating for them.
    let min_len = (count as usize).saturating_mul(EntryRecord::MIN_SIZE);
    if data.len() < min_len {
        return Err(ParseError::NeedMoreBytes(min_len - data.len()));
    }

    let mut records = Vec::with_capacity(count as usize);
    let mut pos = 0;
    for _ in 0..count {
        let (record, n) = parse_record(&data[pos..])?;
        records.push(record);
        pos += n;
    }

    tracing::debug!(bytes = pos, count, "parsed entry table");

    Ok((records, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(name: &str, ty: &str, last_modified: i64, length: u64, offset: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&(ty.len() as u16).to_le_bytes());
        buf.extend_from_slice(ty.as_bytes());
        buf.extend_from_slice(&last_modified.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf.extend_from_slice(&offset.to_le_bytes());
        buf
    }

    #[test]
    fn primitives() {
        assert_eq!(parse_u16_le(&[0x34, 0x12]).unwrap(), (0x1234, 2));
        assert_eq!(parse_u32_le(&[1, 0, 0, 0, 9]).unwrap(), (1, 4));
        assert_eq!(parse_i64_le(&(-5i64).to_le_bytes()).unwrap(), (-5, 8));
        assert_eq!(parse_u64_le(&[0; 3]), Err(ParseError::NeedMoreBytes(5)));
        assert_eq!(parse_u8(&[]), Err(ParseError::NeedMoreBytes(1)));
    }

    #[test]
    fn str16() {
        let mut data = vec![3, 0];
        data.extend_from_slice(b"abcdef");
        assert_eq!(parse_str16(&data).unwrap(), ("abc", 5));

        assert_eq!(parse_str16(&[4, 0, b'a']), Err(ParseError::NeedMoreBytes(3)));
        assert_eq!(parse_str16(&[1, 0, 0xff]), Err(ParseError::InvalidUtf8));
    }

    #[test]
    fn header() {
        let mut data = MAGIC_BYTES.to_vec();
        data.extend_from_slice(&[VERSION, 0, 0, 0]);
        data.extend_from_slice(&7u32.to_le_bytes());

        let (header, consumed) = parse_header(&data).unwrap();
        assert_eq!(consumed, BundleHeader::SIZE);
        assert_eq!(header.entry_count, 7);
        assert_eq!(header, BundleHeader::new(7));
    }

    #[test]
    fn header_rejects_foreign_data() {
        assert_eq!(
            parse_header(b"ESMARCHIVE\0\0\0\0"),
            Err(ParseError::BadMagic(*b"ESMA"))
        );

        let mut data = MAGIC_BYTES.to_vec();
        data.extend_from_slice(&[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(parse_header(&data), Err(ParseError::UnsupportedVersion(2)));

        assert_eq!(parse_header(MAGIC_BYTES), Err(ParseError::NeedMoreBytes(8)));
    }

    #[test]
    fn record() {
        let data = record_bytes("a.js", "text/javascript", 1_700_000_000_123, 42, 10);
        let (record, consumed) = parse_record(&data).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(consumed, record.encoded_len());
        assert_eq!(record.name(), "a.js");
        assert_eq!(record.entry.content_type, "text/javascript");
        assert_eq!(record.entry.last_modified, 1_700_000_000_123);
        assert_eq!(record.length(), 42);
        assert_eq!(record.offset, 10);
    }

    #[test]
    fn record_rejects_empty_name() {
        let data = record_bytes("", "text/plain", 0, 0, 0);
        assert_eq!(
            parse_record(&data),
            Err(ParseError::InvalidData("empty entry name"))
        );
    }

    #[test]
    fn table_rejects_impossible_count() {
        let data = record_bytes("a", "", 0, 0, 0);
        assert!(matches!(
            parse_table(&data, u32::MAX),
            Err(ParseError::NeedMoreBytes(_))
        ));
    }

    #[test]
    fn table() {
        let mut data = record_bytes("a", "x/a", 1, 2, 0);
        data.extend(record_bytes("b", "x/b", 3, 4, 2));
        let (records, consumed) = parse_table(&data, 2).unwrap();
        assert_eq!(consumed, data.len());
        assert_eq!(records[0].name(), "a");
        assert_eq!(records[1].name(), "b");
        assert_eq!(records[1].offset, 2);
    }
}
