//! Error types for mimestream-multipart.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("boundary cannot change after a part has been added")]
    BoundaryAlreadyInUse,

    #[error("invalid boundary length {len}: must be between 1 and 70 bytes")]
    InvalidBoundaryLength { len: usize },

    #[error("invalid boundary character {ch:?} at index {index}")]
    InvalidBoundaryChar { ch: char, index: usize },

    #[error("failed to stat '{path}': {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to close '{path}': {source}")]
    Close { path: PathBuf, source: io::Error },
}

impl Error {
    /// Boundary misuse, reported synchronously by the call that caused it.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::BoundaryAlreadyInUse
                | Self::InvalidBoundaryLength { .. }
                | Self::InvalidBoundaryChar { .. }
        )
    }

    /// A backing file could not be inspected, opened, read or released.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            Self::Stat { .. } | Self::Open { .. } | Self::Read { .. } | Self::Close { .. }
        )
    }

    /// The [`io::ErrorKind`] this error surfaces as through `std::io::Read`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::BoundaryAlreadyInUse
            | Self::InvalidBoundaryLength { .. }
            | Self::InvalidBoundaryChar { .. } => io::ErrorKind::InvalidInput,
            Self::Stat { source, .. }
            | Self::Open { source, .. }
            | Self::Read { source, .. }
            | Self::Close { source, .. } => source.kind(),
        }
    }

    /// Recover the encoder error carried inside an [`io::Error`] returned by
    /// the encoder's `Read` implementation.
    pub fn from_io(err: &io::Error) -> Option<&Error> {
        err.get_ref()?.downcast_ref::<Error>()
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self { io::Error::new(e.kind(), e) }
}

pub type Result<T> = std::result::Result<T, Error>;
