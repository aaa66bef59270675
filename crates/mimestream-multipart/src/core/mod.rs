//! Pure functions: boundary policy and frame rendering.

pub mod boundary;
pub mod header;
