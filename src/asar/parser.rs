//! Archive header parser.
//!
//! Reads the 16-byte length prefix and the JSON directory tree that
//! follows it, from any source implementing [`ReadAt`].
//!
//! ## Layout
//!
//! ```text
//! 0   u32 LE  data_size
//! 4   u32 LE  header_size
//! 8   u32 LE  header_object_size
//! 12  u32 LE  header_string_size
//! 16  header_string_size bytes of JSON: { "files": { ... } }
//!     zero padding to a multiple of 4   <- base offset
//!     file data
//! ```

use std::io::{Error as IoError, ErrorKind};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::{Directory, Header, HeaderTree};

/// Parsed header and directory tree of an archive
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub header: Header,
    pub root: Directory,
}

impl ParsedHeader {
    pub fn base_offset(&self) -> u64 {
        self.header.base_offset()
    }
}

/// Read and parse the archive header.
///
/// # Errors
///
/// Returns [`Error::Io`] if the source ends before `16 + header_string_size`
/// bytes, and [`Error::Format`] if the JSON is not valid UTF-8, is malformed,
/// or lacks a `"files"` object.
pub fn parse_header<R: ReadAt>(reader: &mut R) -> Result<ParsedHeader> {
    let mut prefix = [0u8; Header::SIZE];
    reader.read_exact_at(0, &mut prefix)?;
    let header = Header::from_bytes(&prefix)?;

    debug!(
        data_size = header.data_size,
        header_size = header.header_size,
        header_object_size = header.header_object_size,
        header_string_size = header.header_string_size,
        "read archive header"
    );

    if !header.is_consistent() {
        warn!(?header, "header length fields do not match the JSON size");
    }

    // Check the length against the source before allocating for it
    let json_end = Header::SIZE as u64 + header.header_string_size as u64;
    let size = reader.size()?;
    if json_end > size {
        return Err(IoError::new(
            ErrorKind::UnexpectedEof,
            format!("header needs {json_end} bytes but the archive has {size}"),
        )
        .into());
    }

    let mut json = vec![0u8; header.header_string_size as usize];
    reader.read_exact_at(Header::SIZE as u64, &mut json)?;

    let root = parse_tree(&json)?;

    Ok(ParsedHeader { header, root })
}

/// Parse the JSON blob into the root directory
pub fn parse_tree(json: &[u8]) -> Result<Directory> {
    let text = std::str::from_utf8(json)
        .map_err(|err| Error::format(format!("header is not UTF-8: {err}")))?;
    let tree: HeaderTree = serde_json::from_str(text)?;
    Ok(Directory { files: tree.files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prefix(string_size: u32) -> Vec<u8> {
        let padded = (string_size + 3) & !3;
        [4, padded + 8, padded + 4, string_size]
            .iter()
            .flat_map(|f: &u32| f.to_le_bytes())
            .collect()
    }

    fn archive(json: &str, data: &[u8]) -> Cursor<Vec<u8>> {
        let mut bytes = prefix(json.len() as u32);
        bytes.extend_from_slice(json.as_bytes());
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes.extend_from_slice(data);
        Cursor::new(bytes)
    }

    #[test]
    fn parses_header_and_tree() {
        let json = r#"{"files":{"a.txt":{"offset":"0","size":5}}}"#;
        let parsed = parse_header(&mut archive(json, b"hello")).unwrap();
        assert_eq!(parsed.header.header_string_size as usize, json.len());
        assert_eq!(parsed.base_offset(), 60);
        assert!(parsed.root.get("a.txt").unwrap().as_file().is_some());
    }

    #[test]
    fn truncated_prefix_is_io_error() {
        let mut cursor = Cursor::new(vec![4u8, 0, 0, 0, 8]);
        assert!(parse_header(&mut cursor).unwrap_err().is_io());
    }

    #[test]
    fn missing_json_bytes_is_io_error() {
        let mut bytes = prefix(100);
        bytes.extend_from_slice(br#"{"files":{}}"#);
        assert!(parse_header(&mut Cursor::new(bytes)).unwrap_err().is_io());
    }

    #[test]
    fn truncated_json_is_format_error() {
        let json = r#"{"files":{"a.txt":{"offset":"0","size":5}}}"#;
        let cut = &json[..json.len() - 3];
        let err = parse_header(&mut archive(cut, b"")).unwrap_err();
        assert!(err.is_format(), "{err}");
    }

    #[test]
    fn missing_files_key_is_format_error() {
        let err = parse_header(&mut archive(r#"{"folders":{}}"#, b"")).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn non_utf8_json_is_format_error() {
        assert!(parse_tree(&[0x7b, 0xff, 0x7d]).unwrap_err().is_format());
    }

    #[test]
    fn unrecognised_entry_shape_is_format_error() {
        assert!(parse_tree(br#"{"files":{"a":"b"}}"#).unwrap_err().is_format());
    }
}
