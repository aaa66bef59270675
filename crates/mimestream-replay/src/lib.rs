//! Replayable request bodies.
//!
//! HTTP clients that retry or follow redirects need to send the same body
//! more than once. [`ReplayBody`] wraps a body source and can start it over:
//! in-memory data is re-served, seekable sources are rewound, factories are
//! called again, and multipart encoders are rewound without re-reading
//! anything into memory.
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use mimestream_multipart::MultipartEncoder;
//! use mimestream_replay::ReplayBody;
//!
//! let mut encoder = MultipartEncoder::new();
//! encoder.add_field("key", "value");
//!
//! let mut body = ReplayBody::from_multipart(encoder);
//! let mut first = Vec::new();
//! body.read_to_end(&mut first).unwrap();
//!
//! body.reset().unwrap();
//! let mut second = Vec::new();
//! body.read_to_end(&mut second).unwrap();
//! assert_eq!(first, second);
//! ```

pub use self::body::{ReaderFactory, ReplayBody};
pub use self::error::{Error, Result};

mod body;
mod error;
