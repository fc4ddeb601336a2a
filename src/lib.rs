//! # rasar
//!
//! A Rust utility for reading and patching asar archives.
//!
//! An asar archive is a single file holding a JSON directory tree followed
//! by the raw bytes of every file. This library parses the header, resolves
//! virtual paths, extracts file content, enumerates the tree and overwrites
//! existing files in place without changing the archive's layout.
//!
//! ## Features
//!
//! - List every file and directory in an archive
//! - Extract a file's bytes by its virtual path
//! - Patch a file in place with content of the same length
//! - Follow link entries and read entries kept in `<archive>.unpacked`
//!
//! ## Example
//!
//! ```no_run
//! use rasar::Archive;
//!
//! fn main() -> rasar::Result<()> {
//!     let mut archive = Archive::open("app.asar")?;
//!
//!     for path in archive.list() {
//!         println!("{}", path);
//!     }
//!
//!     let content = archive.read("package.json")?;
//!     archive.write("package.json", &content)?;
//!     archive.close()
//! }
//! ```

pub mod asar;
pub mod cli;
pub mod error;
pub mod io;

use std::path::Path;

pub use asar::{Archive, ArchiveOptions, Entry};
pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{LocalFile, ReadAt, WriteAt};

/// Open `archive`, read the file at `path`, and close it again
pub fn read_file(archive: impl AsRef<Path>, path: &str) -> Result<Vec<u8>> {
    let mut archive = ArchiveOptions::new().writable(false).open(archive)?;
    archive.read(path)
}

/// Open `archive`, patch the file at `path` in place, and close it again
pub fn write_file(archive: impl AsRef<Path>, path: &str, content: &[u8]) -> Result<()> {
    let mut archive = Archive::open(archive)?;
    archive.write(path, content)?;
    archive.close()
}

/// Open `archive` and collect every path it contains
pub fn list_paths(archive: impl AsRef<Path>) -> Result<Vec<String>> {
    let archive = ArchiveOptions::new().writable(false).open(archive)?;
    Ok(archive.list().collect())
}
