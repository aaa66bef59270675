use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::header::{self, CRLF};
use crate::effects::{FileHandle, FileSystem};
use crate::error::{Error, Result};

/// Open state of the backing file. `Failed` is sticky: the part never retries.
enum FileState {
    Unopened,
    Opened(Box<dyn FileHandle>),
    Failed { kind: io::ErrorKind, message: String },
}

impl fmt::Debug for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => f.write_str("Unopened"),
            Self::Opened(_) => f.write_str("Opened"),
            Self::Failed { kind, .. } => write!(f, "Failed({kind:?})"),
        }
    }
}

/// A file upload: rendered header, raw file bytes, then CRLF.
///
/// The file size is captured when the part is created and stays
/// authoritative for length accounting.
pub(crate) struct FilePart {
    name:      String,
    path:      PathBuf,
    header:    Box<[u8]>,
    file_size: u64,
    offset:    u64,
    state:     FileState,
    fs:        Arc<dyn FileSystem>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("offset", &self.offset)
            .field("state", &self.state)
            .finish()
    }
}

impl FilePart {
    pub(crate) fn new(
        boundary: &str,
        name: &str,
        path: &Path,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let stat = fs.stat(path).map_err(|source| Error::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        if stat.is_dir {
            return Err(Error::Stat {
                path:   path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::IsADirectory),
            });
        }

        let header = header::file_header(boundary, name, &header::base_name(path));
        Ok(Self {
            name: name.to_owned(),
            path: path.to_path_buf(),
            header: header.into_bytes().into_boxed_slice(),
            file_size: stat.len,
            offset: 0,
            state: FileState::Unopened,
            fs,
        })
    }

    pub(crate) fn name(&self) -> &str { &self.name }

    pub(crate) fn path(&self) -> &Path { &self.path }

    pub(crate) fn len(&self) -> u64 { self.header_len() + self.file_size + CRLF.len() as u64 }

    pub(crate) fn remaining(&self) -> u64 { self.len() - self.offset }

    pub(crate) fn is_open(&self) -> bool { matches!(self.state, FileState::Opened(_)) }

    fn header_len(&self) -> u64 { self.header.len() as u64 }

    fn content_end(&self) -> u64 { self.header_len() + self.file_size }

    fn ensure_open(&mut self) -> Result<()> {
        if let FileState::Unopened = self.state {
            self.state = match self.fs.open(&self.path) {
                Ok(handle) => FileState::Opened(handle),
                Err(e) => FileState::Failed {
                    kind:    e.kind(),
                    message: e.to_string(),
                },
            };
        }

        match &self.state {
            FileState::Failed { kind, message } => Err(Error::Open {
                path:   self.path.clone(),
                source: io::Error::new(*kind, message.clone()),
            }),
            _ => Ok(()),
        }
    }

    /// Copy as much of the part as fits, crossing header, content and trailer
    /// regions within a single call when the buffer allows it.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let mut n = 0;

        let header_len = self.header_len();
        if self.offset < header_len {
            let src = &self.header[self.offset as usize..];
            let k = src.len().min(buf.len());
            buf[..k].copy_from_slice(&src[..k]);
            n += k;
            self.offset += k as u64;
        }

        let content_end = self.content_end();
        if n < buf.len() && self.offset >= header_len && self.offset < content_end {
            let file_offset = self.offset - header_len;
            let want = (content_end - self.offset).min((buf.len() - n) as u64) as usize;
            let FileState::Opened(handle) = &mut self.state else {
                return Ok(n);
            };
            let result = match handle.read_at(&mut buf[n..n + want], file_offset) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file shorter than the {} bytes recorded when added", self.file_size),
                )),
                other => other,
            };
            let k = match result {
                Ok(k) => k,
                // bytes already copied are reported first; the error resurfaces next call
                Err(_) if n > 0 => return Ok(n),
                Err(source) => {
                    return Err(Error::Read {
                        path: self.path.clone(),
                        source,
                    });
                }
            };
            n += k;
            self.offset += k as u64;
        }

        if n < buf.len() && self.offset >= content_end && self.offset < self.len() {
            let src = &CRLF[(self.offset - content_end) as usize..];
            let k = src.len().min(buf.len() - n);
            buf[n..n + k].copy_from_slice(&src[..k]);
            n += k;
            self.offset += k as u64;
        }

        Ok(n)
    }

    /// Release the file handle if open. A failed part stays failed.
    pub(crate) fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, FileState::Unopened) {
            FileState::Opened(handle) => handle.close().map_err(|source| Error::Close {
                path: self.path.clone(),
                source,
            }),
            failed @ FileState::Failed { .. } => {
                self.state = failed;
                Ok(())
            }
            FileState::Unopened => Ok(()),
        }
    }

    pub(crate) fn rewind(&mut self) { self.offset = 0; }
}
