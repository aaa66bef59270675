use std::io;
use std::sync::Arc;

use crate::part::PartInfo;

/// Observer invoked synchronously inside every encoder read attempt.
///
/// It runs on the reading thread and stalls the producer while it runs.
/// It only receives shared views, so it cannot re-enter the encoder.
pub type ProgressCallback = Arc<dyn Fn(&Progress<'_>) + Send + Sync>;

/// Snapshot passed to a [`ProgressCallback`].
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// The part that was read, or `None` for the closing boundary.
    pub part: Option<PartInfo<'a>>,

    /// The error the read attempt failed with, if any.
    pub error: Option<&'a io::Error>,

    /// Bytes produced so far, across all parts.
    pub bytes_read: u64,

    /// Bytes the whole body will have once drained.
    pub total_bytes: u64,

    /// Set once the closing boundary has been fully emitted.
    pub finished: bool,
}

impl Progress<'_> {
    /// Percentage of the body produced so far.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            if self.finished { 100.0 } else { 0.0 }
        } else {
            (self.bytes_read as f64 / self.total_bytes as f64) * 100.0
        }
    }

    #[must_use]
    pub fn is_terminator(&self) -> bool { self.part.is_none() }
}
