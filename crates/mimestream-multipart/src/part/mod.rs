//! The two part kinds. Reading is crate-internal: bytes only leave a part
//! through the encoder, callers see parts through [`PartInfo`].

mod field;
mod file;

use std::path::Path;

use crate::error::Result;

pub(crate) use field::FieldPart;
pub(crate) use file::FilePart;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    Field,
    File,
}

#[derive(Debug)]
pub(crate) enum Part {
    Field(FieldPart),
    File(FilePart),
}

impl Part {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Field(p) => p.name(),
            Self::File(p) => p.name(),
        }
    }

    pub(crate) fn len(&self) -> u64 {
        match self {
            Self::Field(p) => p.len(),
            Self::File(p) => p.len(),
        }
    }

    pub(crate) fn remaining(&self) -> u64 {
        match self {
            Self::Field(p) => p.remaining(),
            Self::File(p) => p.remaining(),
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Field(p) => Ok(p.read(buf)),
            Self::File(p) => p.read(buf),
        }
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        match self {
            Self::Field(_) => Ok(()),
            Self::File(p) => p.close(),
        }
    }

    pub(crate) fn rewind(&mut self) {
        match self {
            Self::Field(p) => p.rewind(),
            Self::File(p) => p.rewind(),
        }
    }
}

/// Read-only view of a part handed to progress observers and iterators.
#[derive(Clone, Copy)]
pub struct PartInfo<'a> {
    part: &'a Part,
}

impl<'a> PartInfo<'a> {
    pub(crate) fn new(part: &'a Part) -> Self { Self { part } }

    /// The form field name.
    pub fn name(&self) -> &'a str { self.part.name() }

    pub fn kind(&self) -> PartKind {
        match self.part {
            Part::Field(_) => PartKind::Field,
            Part::File(_) => PartKind::File,
        }
    }

    /// Backing file of a file part.
    pub fn path(&self) -> Option<&'a Path> {
        match self.part {
            Part::Field(_) => None,
            Part::File(p) => Some(p.path()),
        }
    }

    /// Encoded length including boundary line, headers and trailing CRLF.
    pub fn encoded_len(&self) -> u64 { self.part.len() }

    pub fn remaining(&self) -> u64 { self.part.remaining() }

    pub fn is_consumed(&self) -> bool { self.part.remaining() == 0 }

    /// Whether a file part currently holds an open handle. Always false for fields.
    pub fn is_open(&self) -> bool {
        match self.part {
            Part::Field(_) => false,
            Part::File(p) => p.is_open(),
        }
    }
}

impl std::fmt::Debug for PartInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartInfo")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("encoded_len", &self.encoded_len())
            .field("remaining", &self.remaining())
            .finish()
    }
}
