use std::ffi::OsStr;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{LocalFile, ReadAt, WriteAt};

use super::parser::{ParsedHeader, parse_header};
use super::path::{Canonical, resolve, segments};
use super::structures::{Directory, Entry, FileEntry, Header};
use super::walk::{Paths, Walk};

/// Options for opening an archive from the filesystem
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    writable: bool,
    unpacked_dir: Option<PathBuf>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            writable: true,
            unpacked_dir: None,
        }
    }
}

impl ArchiveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the archive for writing as well as reading (default: true)
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Directory holding unpacked entries (default: `<archive>.unpacked`)
    pub fn unpacked_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unpacked_dir = Some(dir.into());
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<Archive<LocalFile>> {
        let path = path.as_ref();
        let file = LocalFile::open(path, self.writable)?;

        let unpacked_dir = self
            .unpacked_dir
            .clone()
            .unwrap_or_else(|| default_unpacked_dir(path));

        debug!(path = %path.display(), writable = self.writable, "opening archive");

        let mut archive = Archive::new(file)?;
        archive.unpacked_dir = Some(unpacked_dir);
        archive.writable = self.writable;
        Ok(archive)
    }
}

/// `app.asar` keeps its unpacked entries in `app.asar.unpacked`
fn default_unpacked_dir(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".unpacked");
    PathBuf::from(name)
}

/// An open archive.
///
/// Owns the backing storage and the parsed directory tree. Operations that
/// touch the storage take `&mut self`, so each one holds an exclusive lease
/// on the handle for its duration.
pub struct Archive<F> {
    file: F,
    header: Header,
    root: Entry,
    base_offset: u64,
    unpacked_dir: Option<PathBuf>,
    writable: bool,
}

impl Archive<LocalFile> {
    /// Open an archive file for reading and patching
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        ArchiveOptions::new().open(path)
    }
}

impl<F: ReadAt> Archive<F> {
    /// Parse the header of an archive held by `file`
    pub fn new(mut file: F) -> Result<Self> {
        let ParsedHeader { header, root } = parse_header(&mut file)?;
        let base_offset = header.base_offset();

        debug!(base_offset, entries = root.len(), "parsed archive tree");

        Ok(Self {
            file,
            header,
            root: Entry::Directory(root),
            base_offset,
            unpacked_dir: None,
            writable: true,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Absolute position of the data region
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn root(&self) -> &Directory {
        match &self.root {
            Entry::Directory(dir) => dir,
            _ => unreachable!("archive root is always a directory"),
        }
    }

    pub fn unpacked_dir(&self) -> Option<&Path> {
        self.unpacked_dir.as_deref()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Look up the entry at `path` without following a final link
    pub fn entry(&self, path: &str) -> Result<&Entry> {
        Ok(resolve(&self.root, path, false)?.entry)
    }

    /// Every path in the archive, directories suffixed with `/`
    pub fn list(&self) -> Paths<'_> {
        Paths::new(self.root())
    }

    /// Every `(path, entry)` pair in the archive
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self.root())
    }

    /// Read the full content of the file at `path`
    pub fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let Canonical { entry, path: canonical } = resolve(&self.root, path, true)?;
        let file = expect_file(entry, path)?;

        if file.unpacked {
            let location = unpacked_location(self.unpacked_dir.as_deref(), &canonical, path)?;
            debug!(path, location = %location.display(), "reading unpacked file");
            return Ok(std::fs::read(location)?);
        }

        let (position, size) = locate(self.base_offset, file, path)?;
        let len = usize::try_from(size)
            .map_err(|_| Error::format(format!("file '{path}' is too large to read")))?;

        debug!(path, position, size, "reading file");

        let mut buf = vec![0u8; len];
        self.file.read_exact_at(position, &mut buf)?;
        Ok(buf)
    }

    /// Read the file at `path` as UTF-8 text
    pub fn read_to_string(&mut self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::format(format!("file '{path}' is not valid UTF-8")))
    }
}

impl<F: ReadAt + WriteAt> Archive<F> {
    /// Overwrite the content of an existing file in place.
    ///
    /// `content` must be exactly as long as the entry's declared size: the
    /// data region is never resized and entries are never relocated, so any
    /// other length fails with [`Error::SizeMismatch`] before a byte is
    /// written. Metadata is left untouched, and neither the archive nor an
    /// unpacked sibling file ever changes length.
    pub fn write(&mut self, path: &str, content: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(IoError::new(
                ErrorKind::PermissionDenied,
                format!("cannot patch '{path}': archive was opened read-only"),
            )
            .into());
        }

        let Canonical { entry, path: canonical } = resolve(&self.root, path, true)?;
        let file = expect_file(entry, path)?;

        let expected = file.data_size(path)?;
        let actual = content.len() as u64;
        if expected != actual {
            return Err(Error::SizeMismatch {
                path: path.to_string(),
                expected,
                actual,
            });
        }

        if file.unpacked {
            let location = unpacked_location(self.unpacked_dir.as_deref(), &canonical, path)?;
            debug!(path, location = %location.display(), "patching unpacked file");

            // Existing file only: no create, no truncate
            let mut sibling = LocalFile::open(&location, true)?;
            let on_disk = sibling.size()?;
            if on_disk != expected {
                return Err(Error::format(format!(
                    "unpacked file for '{path}' is {on_disk} bytes but the entry declares {expected}"
                )));
            }
            sibling.write_all_at(0, content)?;
            sibling.flush_all()?;
            return Ok(());
        }

        let (position, _) = locate(self.base_offset, file, path)?;
        let end = position
            .checked_add(expected)
            .ok_or_else(|| Error::format(format!("file '{path}' has an out of range offset")))?;
        let archive_size = self.file.size()?;
        if end > archive_size {
            return Err(IoError::new(
                ErrorKind::UnexpectedEof,
                format!("file '{path}' ends at {end} but the archive has {archive_size} bytes"),
            )
            .into());
        }

        debug!(path, position, size = actual, "patching file");

        self.file.write_all_at(position, content)?;
        Ok(())
    }

    /// Flush pending writes and release the handle
    pub fn close(mut self) -> Result<()> {
        self.file.flush_all()?;
        Ok(())
    }
}

fn expect_file<'a>(entry: &'a Entry, path: &str) -> Result<&'a FileEntry> {
    match entry {
        Entry::File(file) => Ok(file),
        Entry::Directory(_) => Err(Error::IsDirectory(path.to_string())),
        // Final links are always followed before reaching here
        Entry::Link(_) => Err(Error::NotFound(path.to_string())),
    }
}

/// Absolute position and size of a packed file's data
fn locate(base_offset: u64, file: &FileEntry, path: &str) -> Result<(u64, u64)> {
    let offset = file.data_offset(path)?;
    let size = file.data_size(path)?;
    let position = base_offset
        .checked_add(offset)
        .ok_or_else(|| Error::format(format!("file '{path}' has an out of range offset")))?;
    Ok((position, size))
}

fn unpacked_location(dir: Option<&Path>, canonical: &str, path: &str) -> Result<PathBuf> {
    let dir = dir.ok_or_else(|| {
        Error::format(format!(
            "file '{path}' is stored outside the archive but no unpacked directory is known"
        ))
    })?;

    // Every segment must stay a single plain name below `dir`
    let mut location = dir.to_path_buf();
    for segment in segments(canonical) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == OsStr::new(segment) => {
                location.push(name);
            }
            _ => {
                return Err(Error::format(format!(
                    "file '{path}' has an unsafe unpacked location '{canonical}'"
                )));
            }
        }
    }
    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pack(json: &str, data: &[u8]) -> Vec<u8> {
        let size = json.len() as u32;
        let padded = (size + 3) & !3;
        let mut bytes: Vec<u8> = [4, padded + 8, padded + 4, size]
            .iter()
            .flat_map(|f: &u32| f.to_le_bytes())
            .collect();
        bytes.extend_from_slice(json.as_bytes());
        bytes.resize(16 + padded as usize, 0);
        bytes.extend_from_slice(data);
        bytes
    }

    fn sample() -> Archive<Cursor<Vec<u8>>> {
        let json = r#"{"files":{
            "a.txt":{"offset":"0","size":5},
            "b.txt":{"offset":"5","size":5},
            "lib":{"files":{"index.js":{"offset":"10","size":3,"executable":true}}},
            "index.js":{"link":"lib/index.js"},
            "nodata":{},
            "badoffset":{"offset":"ten","size":1},
            "nosize":{"offset":"0"},
            "big.node":{"size":4,"unpacked":true}
        }}"#;
        Archive::new(Cursor::new(pack(json, b"helloworldjs!"))).unwrap()
    }

    #[test]
    fn reads_the_canonical_scenario() {
        let json = r#"{"files":{"a.txt":{"offset":"0","size":5}}}"#;
        let mut archive = Archive::new(Cursor::new(pack(json, b"hello"))).unwrap();
        assert_eq!(archive.base_offset(), 60);
        assert_eq!(archive.read("a.txt").unwrap(), b"hello");
    }

    #[test]
    fn reads_at_base_plus_offset() {
        let mut archive = sample();
        assert_eq!(archive.read("a.txt").unwrap(), b"hello");
        assert_eq!(archive.read("b.txt").unwrap(), b"world");
        assert_eq!(archive.read_to_string("lib/index.js").unwrap(), "js!");
    }

    #[test]
    fn reads_through_links() {
        let mut archive = sample();
        assert_eq!(archive.read("index.js").unwrap(), b"js!");
        assert!(matches!(archive.entry("index.js").unwrap(), Entry::Link(_)));
    }

    #[test]
    fn read_errors() {
        let mut archive = sample();
        assert!(archive.read("missing").unwrap_err().is_not_found());
        assert!(matches!(archive.read("lib"), Err(Error::IsDirectory(_))));
        assert!(archive.read("nodata").unwrap_err().is_format());
        assert!(archive.read("badoffset").unwrap_err().is_format());
        assert!(archive.read("nosize").unwrap_err().is_format());
    }

    #[test]
    fn unpacked_entry_needs_a_directory() {
        let mut archive = sample();
        assert!(archive.read("big.node").unwrap_err().is_format());
    }

    #[test]
    fn read_past_end_is_io_error() {
        let json = r#"{"files":{"a.txt":{"offset":"2","size":10}}}"#;
        let mut archive = Archive::new(Cursor::new(pack(json, b"hello"))).unwrap();
        assert!(archive.read("a.txt").unwrap_err().is_io());
    }

    #[test]
    fn write_past_end_does_not_grow_archive() {
        let json = r#"{"files":{"a.txt":{"offset":"100","size":3},"b.txt":{"offset":"3","size":3}}}"#;
        let mut archive = Archive::new(Cursor::new(pack(json, b"hello"))).unwrap();
        let before = archive.file.get_ref().clone();

        assert!(archive.write("a.txt", b"xyz").unwrap_err().is_io());
        assert!(archive.write("b.txt", b"xyz").unwrap_err().is_io());
        assert_eq!(archive.file.get_ref(), &before);
    }

    #[test]
    fn unpacked_location_stays_inside_dir() {
        let dir = Path::new("app.asar.unpacked");
        assert_eq!(
            unpacked_location(Some(dir), "native/a.node", "a").unwrap(),
            dir.join("native").join("a.node")
        );
        for canonical in ["../victim.txt", "native/../../x", "./a", "a//b", ""] {
            let location = unpacked_location(Some(dir), canonical, "a");
            if canonical.is_empty() {
                assert_eq!(location.unwrap(), dir);
            } else {
                assert!(location.unwrap_err().is_format(), "{canonical}");
            }
        }
    }

    #[test]
    fn one_odd_entry_does_not_block_others() {
        let json = r#"{"files":{"good.txt":{"offset":"0","size":5},"odd":{"offset":"0","size":"5"}}}"#;
        let mut archive = Archive::new(Cursor::new(pack(json, b"hello"))).unwrap();
        assert_eq!(archive.read("good.txt").unwrap(), b"hello");
        assert!(archive.read("odd").unwrap_err().is_format());
        assert_eq!(archive.list().count(), 2);
    }

    #[test]
    fn write_then_read_same_length() {
        let mut archive = sample();
        archive.write("b.txt", b"WORLD").unwrap();
        assert_eq!(archive.read("b.txt").unwrap(), b"WORLD");
        assert_eq!(archive.read("a.txt").unwrap(), b"hello");
        assert_eq!(archive.read("lib/index.js").unwrap(), b"js!");
    }

    #[test]
    fn write_through_link_patches_target() {
        let mut archive = sample();
        archive.write("index.js", b"ts?").unwrap();
        assert_eq!(archive.read("lib/index.js").unwrap(), b"ts?");
    }

    #[test]
    fn size_mismatch_leaves_archive_untouched() {
        let mut archive = sample();
        let before = archive.file.get_ref().clone();

        let longer = archive.write("a.txt", b"hello!").unwrap_err();
        assert!(matches!(
            longer,
            Error::SizeMismatch {
                expected: 5,
                actual: 6,
                ..
            }
        ));
        assert!(matches!(
            archive.write("a.txt", b"hi"),
            Err(Error::SizeMismatch { .. })
        ));
        assert_eq!(archive.file.get_ref(), &before);
    }

    #[test]
    fn write_errors() {
        let mut archive = sample();
        assert!(archive.write("nope.txt", b"x").unwrap_err().is_not_found());
        assert!(matches!(archive.write("lib", b""), Err(Error::IsDirectory(_))));
        assert!(archive.write("badoffset", b"x").unwrap_err().is_format());
        assert!(archive.write("nosize", b"x").unwrap_err().is_format());
    }

    #[test]
    fn list_matches_tree() {
        let archive = sample();
        let mut paths: Vec<String> = archive.list().collect();
        paths.sort();
        assert_eq!(
            paths,
            [
                "a.txt",
                "b.txt",
                "badoffset",
                "big.node",
                "index.js",
                "lib/",
                "lib/index.js",
                "nodata",
                "nosize",
            ]
        );
    }

    #[test]
    fn close_flushes() {
        let mut archive = sample();
        archive.write("a.txt", b"HELLO").unwrap();
        archive.close().unwrap();
    }
}
