mod local;

pub use local::LocalFile;

use std::io::{Read, Result, Seek, SeekFrom, Write};

/// Trait for positioned reads from an archive's backing storage
pub trait ReadAt {
    /// Fill `buf` with the bytes starting at `offset`, failing on a short read
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Get the total size of the data source
    fn size(&mut self) -> Result<u64>;
}

/// Trait for positioned writes into an archive's backing storage
pub trait WriteAt {
    /// Write all of `buf` starting at `offset`
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Flush buffered writes to the underlying storage
    fn flush_all(&mut self) -> Result<()>;
}

impl<T: Read + Seek> ReadAt for T {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn size(&mut self) -> Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}

impl<T: Write + Seek> WriteAt for T {
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)
    }

    fn flush_all(&mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn cursor_reads_at_offset() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        let mut buf = [0u8; 3];
        cursor.read_exact_at(4, &mut buf).unwrap();
        assert_eq!(&buf, b"456");
        assert_eq!(cursor.size().unwrap(), 10);
    }

    #[test]
    fn cursor_short_read_is_an_error() {
        let mut cursor = Cursor::new(b"0123".to_vec());
        let mut buf = [0u8; 3];
        let err = cursor.read_exact_at(2, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn cursor_writes_at_offset() {
        let mut cursor = Cursor::new(b"0123456789".to_vec());
        cursor.write_all_at(2, b"ab").unwrap();
        assert_eq!(cursor.get_ref().as_slice(), b"01ab456789");
    }
}
