use super::{ReadAt, WriteAt};
use std::fs::{File, OpenOptions};
use std::io::Result;
use std::path::Path;

/// Local archive file with positioned read/write support
pub struct LocalFile {
    file: File,
}

impl LocalFile {
    /// Open an existing file, read-write unless `writable` is false.
    pub fn open(path: &Path, writable: bool) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(writable).open(path)?;
        Ok(Self { file })
    }
}

impl ReadAt for LocalFile {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            FileExt::read_exact_at(&self.file, buf, offset)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.read_exact(buf)
        }
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

impl WriteAt for LocalFile {
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            FileExt::write_all_at(&self.file, buf, offset)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom, Write};
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(buf)
        }
    }

    fn flush_all(&mut self) -> Result<()> {
        use std::io::Write;
        self.file.flush()
    }
}
