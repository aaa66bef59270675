use std::fs::File;
use std::io;
use std::path::Path;

/// What a file part needs to know about its file at add time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub len:    u64,
    pub is_dir: bool,
}

/// File-system operations consumed by file parts.
///
/// The encoder stats a file when it is added and opens it lazily on the
/// first read. Implementations must be usable from whichever thread ends up
/// draining the encoder.
pub trait FileSystem: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    fn open(&self, path: &Path) -> io::Result<Box<dyn FileHandle>>;
}

/// An open file supporting positioned reads.
pub trait FileHandle: Send {
    /// Read into `buf` starting at `offset`; `Ok(0)` means end of file.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    fn close(self: Box<Self>) -> io::Result<()>;
}

/// The platform file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStat {
            len:    meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        Ok(Box::new(LocalFile(File::open(path)?)))
    }
}

struct LocalFile(File);

impl FileHandle for LocalFile {
    #[cfg(unix)]
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.0.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.0.seek_read(buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        self.0.seek(SeekFrom::Start(offset))?;
        self.0.read(buf)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self.0);
        Ok(())
    }
}
