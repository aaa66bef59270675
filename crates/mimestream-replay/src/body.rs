use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use mimestream_multipart::MultipartEncoder;

use crate::error::{Error, Result};

/// Produces a fresh reader over the same content on every call.
pub type ReaderFactory = Box<dyn FnMut() -> io::Result<Box<dyn Read + Send>> + Send>;

trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

enum Source {
    Buffered(Cursor<Arc<[u8]>>),
    Seekable(Box<dyn SeekRead>),
    Rebuilt {
        factory: ReaderFactory,
        reader:  Box<dyn Read + Send>,
    },
    Multipart(MultipartEncoder),
}

impl Source {
    fn label(&self) -> &'static str {
        match self {
            Self::Buffered(_) => "buffered",
            Self::Seekable(_) => "seekable",
            Self::Rebuilt { .. } => "rebuilt",
            Self::Multipart(_) => "multipart",
        }
    }
}

/// A request body that can be read again from the start, e.g. to retry an upload.
///
/// Content is either held in memory, rewound in place, or rebuilt from a
/// factory, whichever the source allows without copying more than needed.
pub struct ReplayBody {
    source:         Source,
    content_length: Option<u64>,
}

impl fmt::Debug for ReplayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayBody")
            .field("source", &self.source.label())
            .field("content_length", &self.content_length)
            .finish()
    }
}

impl ReplayBody {
    /// Serve `data` from memory.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        let data: Arc<[u8]> = data.into();
        tracing::debug!(source = "buffered", len = data.len(), "built replay body");
        Self {
            content_length: Some(data.len() as u64),
            source:         Source::Buffered(Cursor::new(data)),
        }
    }

    /// Drain `reader` into memory so it can be served repeatedly.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data))
    }

    /// Rewind `reader` in place on reset. The length is unknown unless set
    /// with [`with_content_length`](Self::with_content_length).
    pub fn from_seekable(reader: impl Read + Seek + Send + 'static) -> Self {
        tracing::debug!(source = "seekable", "built replay body");
        Self {
            source:         Source::Seekable(Box::new(reader)),
            content_length: None,
        }
    }

    /// Call `factory` for the first reader and again on every reset.
    pub fn from_fn<F>(mut factory: F) -> Result<Self>
    where
        F: FnMut() -> io::Result<Box<dyn Read + Send>> + Send + 'static,
    {
        let reader = factory().map_err(|source| Error::Rebuild { source })?;
        tracing::debug!(source = "rebuilt", "built replay body");
        Ok(Self {
            source:         Source::Rebuilt {
                factory: Box::new(factory),
                reader,
            },
            content_length: None,
        })
    }

    /// Stream a multipart body, rewinding the encoder on reset and closing it on close.
    pub fn from_multipart(encoder: MultipartEncoder) -> Self {
        let total = encoder.total_length();
        tracing::debug!(
            source = "multipart",
            parts = encoder.len(),
            len = total,
            "built replay body"
        );
        Self {
            source:         Source::Multipart(encoder),
            content_length: Some(total),
        }
    }

    #[must_use]
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    /// Length for a `Content-Length` header, when known.
    pub fn content_length(&self) -> Option<u64> { self.content_length }

    /// Start over from the first byte.
    pub fn reset(&mut self) -> Result<()> {
        tracing::debug!(source = self.source.label(), "resetting replay body");
        match &mut self.source {
            Source::Buffered(cursor) => cursor.set_position(0),
            Source::Seekable(reader) => {
                reader.seek(SeekFrom::Start(0))?;
            }
            Source::Rebuilt { factory, reader } => {
                *reader = factory().map_err(|source| Error::Rebuild { source })?;
            }
            Source::Multipart(encoder) => encoder.rewind(),
        }
        Ok(())
    }

    /// Release whatever the source holds. Only multipart sources own resources
    /// beyond memory; closing them twice is harmless.
    pub fn close(&mut self) -> Result<()> {
        tracing::debug!(source = self.source.label(), "closing replay body");
        if let Source::Multipart(encoder) = &mut self.source {
            encoder.close()?;
        }
        Ok(())
    }
}

impl Read for ReplayBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Buffered(cursor) => cursor.read(buf),
            Source::Seekable(reader) => reader.read(buf),
            Source::Rebuilt { reader, .. } => reader.read(buf),
            Source::Multipart(encoder) => encoder.read(buf),
        }
    }
}
