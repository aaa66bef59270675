//! In-memory file system for unit tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::effects::{FileHandle, FileStat, FileSystem};

#[derive(Default)]
struct Inner {
    files:       HashMap<PathBuf, Arc<Vec<u8>>>,
    dirs:        Vec<PathBuf>,
    opens:       HashMap<PathBuf, usize>,
    open_now:    usize,
    fail_closes: Vec<PathBuf>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryFs(Arc<Mutex<Inner>>);

impl MemoryFs {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.insert(path, data);
        self
    }

    pub(crate) fn with_dir(self, path: &str) -> Self {
        self.0.lock().unwrap().dirs.push(PathBuf::from(path));
        self
    }

    pub(crate) fn failing_close(self, path: &str) -> Self {
        self.0.lock().unwrap().fail_closes.push(PathBuf::from(path));
        self
    }

    pub(crate) fn insert(&self, path: &str, data: &[u8]) {
        self.0
            .lock()
            .unwrap()
            .files
            .insert(PathBuf::from(path), Arc::new(data.to_vec()));
    }

    pub(crate) fn remove(&self, path: &str) { self.0.lock().unwrap().files.remove(Path::new(path)); }

    /// Open attempts for `path`, successful or not.
    pub(crate) fn open_count(&self, path: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .opens
            .get(Path::new(path))
            .copied()
            .unwrap_or(0)
    }

    /// Handles currently open across all files.
    pub(crate) fn open_handles(&self) -> usize { self.0.lock().unwrap().open_now }

    pub(crate) fn shared(&self) -> Arc<dyn FileSystem> { Arc::new(self.clone()) }
}

impl FileSystem for MemoryFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let inner = self.0.lock().unwrap();
        if inner.dirs.iter().any(|d| d == path) {
            return Ok(FileStat { len: 0, is_dir: true });
        }
        inner
            .files
            .get(path)
            .map(|data| FileStat {
                len:    data.len() as u64,
                is_dir: false,
            })
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        let mut inner = self.0.lock().unwrap();
        *inner.opens.entry(path.to_path_buf()).or_default() += 1;
        let data = inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        inner.open_now += 1;
        Ok(Box::new(MemoryHandle {
            path: path.to_path_buf(),
            fs: self.clone(),
            data,
        }))
    }
}

struct MemoryHandle {
    path: PathBuf,
    fs:   MemoryFs,
    data: Arc<Vec<u8>>,
}

impl FileHandle for MemoryHandle {
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        // re-read the current content so truncation after open is visible
        let current = self
            .fs
            .0
            .lock()
            .unwrap()
            .files
            .get(&self.path)
            .cloned()
            .unwrap_or_else(|| self.data.clone());
        let start = (offset as usize).min(current.len());
        let n = (current.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&current[start..start + n]);
        Ok(n)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut inner = self.fs.0.lock().unwrap();
        inner.open_now -= 1;
        if inner.fail_closes.contains(&self.path) {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}
