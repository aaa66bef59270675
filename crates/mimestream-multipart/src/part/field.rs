use crate::core::header;

/// A form field rendered up front and served from memory.
#[derive(Debug)]
pub(crate) struct FieldPart {
    name:   String,
    frame:  Box<[u8]>,
    offset: usize,
}

impl FieldPart {
    pub(crate) fn new(boundary: &str, name: &str, value: &str) -> Self {
        let frame = header::field_frame(boundary, name, value);
        Self {
            name:   name.to_owned(),
            frame:  frame.into_bytes().into_boxed_slice(),
            offset: 0,
        }
    }

    pub(crate) fn name(&self) -> &str { &self.name }

    pub(crate) fn len(&self) -> u64 { self.frame.len() as u64 }

    pub(crate) fn remaining(&self) -> u64 { (self.frame.len() - self.offset) as u64 }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> usize {
        let src = &self.frame[self.offset..];
        let n = src.len().min(buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.offset += n;
        n
    }

    pub(crate) fn rewind(&mut self) { self.offset = 0; }
}
