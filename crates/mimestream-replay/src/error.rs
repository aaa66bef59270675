//! Error types for mimestream-replay.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to rebuild body: {source}")]
    Rebuild { source: io::Error },

    #[error(transparent)]
    Multipart(#[from] mimestream_multipart::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
