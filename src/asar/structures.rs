use byteorder::{LittleEndian, ReadBytesExt};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::{Error, Result};

/// Round `value` up to the next multiple of `multiple` (a power of two)
pub fn round_up(value: u64, multiple: u64) -> u64 {
    (value + multiple - 1) & !(multiple - 1)
}

/// Fixed-size length prefix at the start of every archive - 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub data_size: u32,
    pub header_size: u32,
    pub header_object_size: u32,
    pub header_string_size: u32,
}

impl Header {
    pub const SIZE: usize = 16;

    /// Data region alignment
    pub const ALIGNMENT: u64 = 4;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::format("header is shorter than 16 bytes"));
        }

        let mut cursor = Cursor::new(data);

        Ok(Self {
            data_size: cursor.read_u32::<LittleEndian>()?,
            header_size: cursor.read_u32::<LittleEndian>()?,
            header_object_size: cursor.read_u32::<LittleEndian>()?,
            header_string_size: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Absolute position of the data region: the JSON blob end, padded to 4 bytes
    pub fn base_offset(&self) -> u64 {
        round_up(
            Self::SIZE as u64 + self.header_string_size as u64,
            Self::ALIGNMENT,
        )
    }

    /// Whether the length fields agree with the usual pickle framing
    pub fn is_consistent(&self) -> bool {
        let padded = round_up(self.header_string_size as u64, Self::ALIGNMENT);
        self.data_size == 4
            && self.header_object_size as u64 == padded + 4
            && self.header_size as u64 == padded + 8
    }
}

/// Top-level JSON object of the header
#[derive(Debug, Deserialize)]
pub(crate) struct HeaderTree {
    pub files: BTreeMap<String, Entry>,
}

/// A node of the directory tree.
///
/// The shape is decided by key: `files` makes a directory, `link` a link,
/// anything else a file. File fields are kept as raw JSON so one odd entry
/// does not stop the rest of the archive from opening.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Directory(Directory),
    Link(LinkEntry),
    File(FileEntry),
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Entry::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entry::File(file) => Some(file),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        if let Some(files) = fields.remove("files") {
            let files = BTreeMap::<String, Entry>::deserialize(files).map_err(D::Error::custom)?;
            return Ok(Entry::Directory(Directory { files }));
        }

        if let Some(link) = fields.remove("link") {
            return match link {
                Value::String(link) => Ok(Entry::Link(LinkEntry { link })),
                other => Err(D::Error::custom(format!(
                    "link target must be a string, found {other}"
                ))),
            };
        }

        Ok(Entry::File(FileEntry {
            offset: fields.remove("offset"),
            size: fields.remove("size"),
            executable: flag(&fields, "executable"),
            unpacked: flag(&fields, "unpacked"),
        }))
    }
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Directory {
    pub files: BTreeMap<String, Entry>,
}

impl Directory {
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.files.get(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Symbolic link; `link` is a `/`-separated path from the archive root
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEntry {
    pub link: String,
}

/// File metadata. Fields are validated lazily, when the file is read or patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileEntry {
    pub offset: Option<Value>,
    pub size: Option<Value>,
    pub executable: bool,
    pub unpacked: bool,
}

impl FileEntry {
    /// Offset text as stored, when it is a JSON string
    pub fn raw_offset(&self) -> Option<&str> {
        self.offset.as_ref().and_then(Value::as_str)
    }

    /// Declared size, when it is a non-negative integer
    pub fn declared_size(&self) -> Option<u64> {
        self.size.as_ref().and_then(Value::as_u64)
    }

    /// Offset of the file data relative to the data region
    pub fn data_offset(&self, path: &str) -> Result<u64> {
        match &self.offset {
            None => Err(Error::format(format!("file '{path}' does not contain data"))),
            Some(Value::String(offset)) => offset.parse::<u64>().map_err(|_| {
                Error::format(format!("file '{path}' has invalid offset '{offset}'"))
            }),
            Some(other) => Err(Error::format(format!(
                "file '{path}' has invalid offset {other}"
            ))),
        }
    }

    /// Declared content length in bytes
    pub fn data_size(&self, path: &str) -> Result<u64> {
        self.declared_size()
            .ok_or_else(|| Error::format(format!("file '{path}' has invalid size")))
    }
}
