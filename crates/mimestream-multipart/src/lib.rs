//! Lazy `multipart/form-data` encoding for large uploads.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Configuration and progress types
//! - [`core`](self::core) - Pure boundary policy and frame rendering
//! - [`effects`] - File-system access behind a trait
//!
//! Parts and the [`MultipartEncoder`] that walks them sit on top.
//!
//! # Key Features
//!
//! - **Constant memory**: file content is read with positioned reads while the body is drained
//! - **Known length**: the exact body size is available before the first byte is produced
//! - **Pull-based**: the encoder is a plain [`std::io::Read`], usable as any HTTP client body
//! - **Observable**: an optional callback reports progress after every read attempt
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use mimestream_multipart::MultipartEncoder;
//!
//! let mut encoder = MultipartEncoder::new();
//! encoder.add_field("key", "value");
//! encoder.add_file("upload", "/var/backups/disk.img")?;
//!
//! let content_type = encoder.content_type();
//! let content_length = encoder.total_length();
//!
//! let mut buf = vec![0u8; 64 * 1024];
//! loop {
//!     let n = encoder.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     // send &buf[..n]
//! }
//! encoder.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod data;
pub mod effects;

mod encoder;
mod error;
mod part;

#[cfg(test)]
mod testing;

pub use self::core::boundary::{content_type, generate as generate_boundary, validate as validate_boundary};
pub use data::{EncoderOptions, Progress, ProgressCallback};
pub use effects::{FileHandle, FileStat, FileSystem, LocalFs};
pub use encoder::MultipartEncoder;
pub use error::{Error, Result};
pub use part::{PartInfo, PartKind};
