//! I/O operations behind a trait, so parts can be driven by any file source.

pub mod fs;

pub use fs::{FileHandle, FileStat, FileSystem, LocalFs};
