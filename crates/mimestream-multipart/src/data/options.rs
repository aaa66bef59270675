use std::fmt;
use std::sync::Arc;

use super::progress::{Progress, ProgressCallback};
use crate::effects::{FileSystem, LocalFs};

/// Configuration for a [`MultipartEncoder`](crate::MultipartEncoder).
///
/// # Examples
///
/// ```
/// use mimestream_multipart::{EncoderOptions, MultipartEncoder};
///
/// let options = EncoderOptions::default()
///     .boundary("----FormBoundary7MA4YWxkTrZu0gW")
///     .close_after_read(false);
/// let encoder = MultipartEncoder::with_options(options).unwrap();
/// assert_eq!(encoder.boundary(), "----FormBoundary7MA4YWxkTrZu0gW");
/// ```
#[derive(Clone)]
pub struct EncoderOptions {
    /// Close each file part as soon as it has been fully read.
    ///
    /// Default: true
    pub close_after_read: bool,

    /// Fixed boundary. Validated when the encoder is built.
    ///
    /// Default: None (a random 60 character boundary)
    pub boundary: Option<String>,

    /// Observer invoked after every read attempt.
    ///
    /// Default: None
    pub on_progress: Option<ProgressCallback>,

    /// File system used to stat, open and read file parts.
    ///
    /// Default: [`LocalFs`]
    pub file_system: Arc<dyn FileSystem>,
}

impl fmt::Debug for EncoderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderOptions")
            .field("close_after_read", &self.close_after_read)
            .field("boundary", &self.boundary)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish_non_exhaustive()
    }
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            close_after_read: true,
            boundary: None,
            on_progress: None,
            file_system: Arc::new(LocalFs),
        }
    }
}

impl EncoderOptions {
    #[must_use]
    pub fn close_after_read(mut self, close_after_read: bool) -> Self {
        self.close_after_read = close_after_read;
        self
    }

    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress<'_>) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }
}
