//! Asar archive parsing, extraction and in-place patching.
//!
//! ## Architecture
//!
//! - [`structures`]: the length prefix and the tagged directory tree
//! - [`parser`]: reads the header and JSON tree from raw bytes
//! - [`path`]: walk-by-segment path resolution, shared by reads and writes
//! - [`walk`]: lazy enumeration of every path in the tree
//! - [`archive`]: the high-level [`Archive`] API
//!
//! ## Format Overview
//!
//! An asar file consists of:
//! 1. A 16-byte prefix of four little-endian `u32` length fields
//! 2. A JSON object describing the directory tree
//! 3. Padding to the next 4-byte boundary (the base offset)
//! 4. The concatenated data of every packed file
//!
//! Each file entry records its `offset` (a decimal string, relative to the
//! base offset) and `size`, so one positioned read is enough to extract it.
//!
//! ## Limitations
//!
//! - Patching only replaces content of the same length; the data region is
//!   never resized and entries are never relocated
//! - No archive creation
//! - Integrity hashes are not checked or updated

mod archive;
pub mod parser;
pub mod path;
mod structures;
mod walk;

pub use archive::{Archive, ArchiveOptions};
pub use parser::{ParsedHeader, parse_header};
pub use structures::*;
pub use walk::{Paths, Walk};
