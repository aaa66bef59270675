use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::core::{boundary, header};
use crate::data::{EncoderOptions, Progress, ProgressCallback};
use crate::effects::FileSystem;
use crate::error::{Error, Result};
use crate::part::{FieldPart, FilePart, Part, PartInfo};

fn terminator_len(boundary: &str) -> u64 { (boundary.len() + header::TERMINATOR_OVERHEAD) as u64 }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Serving the part at this index.
    Draining(usize),
    /// All parts drained; this many terminator bytes already emitted.
    Terminating(usize),
    /// Terminator fully emitted.
    Done,
}

/// Pull-based `multipart/form-data` body.
///
/// Fields are rendered when added, files are only stat'ed; their content is
/// read on demand while the body is drained through [`Read`]. The total
/// length is known before the first byte is produced.
///
/// `Read::read` returning `Ok(0)` for a non-empty buffer marks the end of
/// the body. Errors from file parts are carried as [`Error`] inside the
/// returned [`io::Error`] and can be recovered with [`Error::from_io`].
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use mimestream_multipart::MultipartEncoder;
///
/// let mut encoder = MultipartEncoder::new();
/// encoder.add_field("key", "value");
///
/// let mut body = Vec::new();
/// encoder.read_to_end(&mut body).unwrap();
/// assert_eq!(body.len() as u64, encoder.total_length());
/// ```
pub struct MultipartEncoder {
    boundary:         String,
    terminator:       Box<[u8]>,
    parts:            Vec<Part>,
    state:            State,
    bytes_read:       u64,
    total_bytes:      u64,
    close_after_read: bool,
    on_progress:      Option<ProgressCallback>,
    fs:               Arc<dyn FileSystem>,
}

impl Default for MultipartEncoder {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for MultipartEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartEncoder")
            .field("boundary", &self.boundary)
            .field("parts", &self.parts)
            .field("state", &self.state)
            .field("bytes_read", &self.bytes_read)
            .field("total_bytes", &self.total_bytes)
            .field("close_after_read", &self.close_after_read)
            .finish_non_exhaustive()
    }
}

impl MultipartEncoder {
    /// Empty encoder with a freshly generated random boundary.
    pub fn new() -> Self {
        Self::build(boundary::generate(), EncoderOptions::default())
    }

    pub fn with_options(mut options: EncoderOptions) -> Result<Self> {
        let boundary = match options.boundary.take() {
            Some(b) => {
                boundary::validate(&b)?;
                b
            }
            None => boundary::generate(),
        };
        Ok(Self::build(boundary, options))
    }

    fn build(boundary: String, options: EncoderOptions) -> Self {
        let terminator = header::terminator(&boundary).into_bytes().into_boxed_slice();
        Self {
            total_bytes: terminator_len(&boundary),
            terminator,
            boundary,
            parts: Vec::new(),
            state: State::Draining(0),
            bytes_read: 0,
            close_after_read: options.close_after_read,
            on_progress: options.on_progress,
            fs: options.file_system,
        }
    }

    pub fn boundary(&self) -> &str { &self.boundary }

    pub fn boundary_len(&self) -> usize { self.boundary.len() }

    /// Replace the boundary. Only allowed before any part is added or read.
    pub fn set_boundary(&mut self, token: impl Into<String>) -> Result<()> {
        if !self.parts.is_empty() || self.bytes_read > 0 {
            return Err(Error::BoundaryAlreadyInUse);
        }
        let token = token.into();
        boundary::validate(&token)?;

        self.terminator = header::terminator(&token).into_bytes().into_boxed_slice();
        self.total_bytes = terminator_len(&token);
        self.boundary = token;
        Ok(())
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String { boundary::content_type(&self.boundary) }

    pub fn set_close_after_read(&mut self, close_after_read: bool) {
        self.close_after_read = close_after_read;
    }

    /// Install an observer invoked after every read attempt.
    pub fn set_progress<F>(&mut self, callback: F)
    where
        F: Fn(&Progress<'_>) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
    }

    pub fn clear_progress(&mut self) { self.on_progress = None; }

    /// Append a text field. The frame is rendered immediately.
    pub fn add_field(&mut self, name: &str, value: &str) {
        self.push(Part::Field(FieldPart::new(&self.boundary, name, value)));
    }

    /// Append a file. Only its size is captured now; content is read lazily.
    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let part = FilePart::new(&self.boundary, name, path.as_ref(), self.fs.clone())?;
        self.push(Part::File(part));
        Ok(())
    }

    fn push(&mut self, part: Part) {
        self.total_bytes += part.len();
        self.parts.push(part);
    }

    /// Exact number of bytes the body will have. Zero after [`close`](Self::close).
    pub fn total_length(&self) -> u64 { self.total_bytes }

    pub fn bytes_read(&self) -> u64 { self.bytes_read }

    /// Number of parts added.
    pub fn len(&self) -> usize { self.parts.len() }

    pub fn is_empty(&self) -> bool { self.parts.is_empty() }

    pub fn parts(&self) -> impl Iterator<Item = PartInfo<'_>> { self.parts.iter().map(PartInfo::new) }

    /// Whether the closing boundary has been fully emitted.
    pub fn is_done(&self) -> bool { self.state == State::Done }

    /// Restart from the first byte without re-statting files.
    ///
    /// Also revives an encoder that was [`close`](Self::close)d; file parts
    /// reopen lazily and parts whose open failed stay failed.
    pub fn rewind(&mut self) {
        for part in &mut self.parts {
            part.rewind();
        }
        self.state = State::Draining(0);
        self.bytes_read = 0;
        self.total_bytes =
            terminator_len(&self.boundary) + self.parts.iter().map(Part::len).sum::<u64>();
    }

    /// Close every part, then zero the counters.
    ///
    /// Every part is attempted even if an earlier one fails; the first
    /// failure is returned. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let mut first = None;
        for part in &mut self.parts {
            if let Err(e) = part.close() {
                first.get_or_insert(e);
            }
        }
        self.state = State::Done;
        self.bytes_read = 0;
        self.total_bytes = 0;
        first.map_or(Ok(()), Err)
    }

    fn notify(&self, index: Option<usize>, error: Option<&io::Error>) {
        if let Some(callback) = &self.on_progress {
            callback(&Progress {
                part: index.map(|i| PartInfo::new(&self.parts[i])),
                error,
                bytes_read: self.bytes_read,
                total_bytes: self.total_bytes,
                finished: self.state == State::Done,
            });
        }
    }
}

impl Read for MultipartEncoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            let index = match self.state {
                State::Draining(i) if i < self.parts.len() => Some(i),
                _ => None,
            };
            self.notify(index, None);
            return Ok(0);
        }

        let mut n = 0;
        while n < buf.len() {
            match self.state {
                State::Draining(index) if index < self.parts.len() => {
                    match self.parts[index].read(&mut buf[n..]) {
                        Ok(k) => {
                            n += k;
                            self.bytes_read += k as u64;
                            if self.parts[index].remaining() == 0 {
                                if self.close_after_read {
                                    let _ = self.parts[index].close();
                                }
                                self.state = State::Draining(index + 1);
                            }
                            self.notify(Some(index), None);
                        }
                        Err(e) => {
                            let err = io::Error::from(e);
                            self.notify(Some(index), Some(&err));
                            // hand out what was copied; the error resurfaces on the next call
                            return if n > 0 { Ok(n) } else { Err(err) };
                        }
                    }
                }
                State::Draining(_) => self.state = State::Terminating(0),
                State::Terminating(written) => {
                    let src = &self.terminator[written..];
                    let k = src.len().min(buf.len() - n);
                    buf[n..n + k].copy_from_slice(&src[..k]);
                    n += k;
                    self.bytes_read += k as u64;
                    self.state = if written + k == self.terminator.len() {
                        State::Done
                    } else {
                        State::Terminating(written + k)
                    };
                    self.notify(None, None);
                }
                State::Done => break,
            }
        }

        if n == 0 {
            self.notify(None, None);
        }
        Ok(n)
    }
}

/// Only rewinding is supported: the current offset is a no-op, any other
/// target resolving to offset 0 restarts the body, everything else is
/// `InvalidInput`.
impl Seek for MultipartEncoder {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.bytes_read) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.total_bytes) + i128::from(delta),
        };

        if target == i128::from(self.bytes_read) {
            Ok(self.bytes_read)
        } else if target == 0 {
            self.rewind();
            Ok(0)
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot seek to {target}: only rewinding to 0 is supported"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::MemoryFs;

    const BOUNDARY: &str = "test-boundary";

    fn encoder(fs: &MemoryFs) -> MultipartEncoder {
        MultipartEncoder::with_options(
            EncoderOptions::default()
                .boundary(BOUNDARY)
                .file_system(fs.shared()),
        )
        .unwrap()
    }

    fn drain(encoder: &mut MultipartEncoder, chunk: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = encoder.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    fn sample(fs: &MemoryFs) -> MultipartEncoder {
        let mut encoder = encoder(fs);
        encoder.add_field("key", "value");
        encoder.add_file("file0", "/srv/a.bin").unwrap();
        encoder.add_field("type", "data");
        encoder.add_file("file1", "/srv/b.bin").unwrap();
        encoder
    }

    fn sample_fs() -> MemoryFs {
        MemoryFs::new()
            .with_file("/srv/a.bin", b"first file content")
            .with_file("/srv/b.bin", &[0xffu8; 300])
    }

    #[test]
    fn empty_encoder_emits_only_terminator() -> io::Result<()> {
        let mut encoder = encoder(&MemoryFs::new());
        assert_eq!(encoder.total_length(), (BOUNDARY.len() + 6) as u64);
        assert_eq!(drain(&mut encoder, 64)?, b"--test-boundary--\r\n");
        assert!(encoder.is_done());
        Ok(())
    }

    #[test]
    fn wire_format_is_exact() -> io::Result<()> {
        let fs = MemoryFs::new().with_file("/tmp/dir/up.txt", b"RAW");
        let mut encoder = encoder(&fs);
        encoder.add_field("key", "value");
        encoder.add_file("file0", "/tmp/dir/up.txt").unwrap();

        let expected = "--test-boundary\r\n\
            Content-Disposition: form-data; name=\"key\"\r\n\r\n\
            value\r\n\
            --test-boundary\r\n\
            Content-Disposition: form-data; name=\"file0\"; filename=\"up.txt\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            RAW\r\n\
            --test-boundary--\r\n";
        assert_eq!(encoder.total_length(), expected.len() as u64);
        assert_eq!(drain(&mut encoder, 4096)?, expected.as_bytes());
        Ok(())
    }

    #[test]
    fn two_fields_and_empty_file_in_one_read() -> io::Result<()> {
        let fs = MemoryFs::new().with_file("empty.txt", b"");
        let mut encoder = encoder(&fs);
        encoder.add_field("key", "value");
        encoder.add_field("type", "data");
        encoder.add_file("file0", "empty.txt").unwrap();

        let expected = (BOUNDARY.len() + 6)
            + header::field_frame(BOUNDARY, "key", "value").len()
            + header::field_frame(BOUNDARY, "type", "data").len()
            + header::file_header(BOUNDARY, "file0", "empty.txt").len()
            + 2;
        assert_eq!(encoder.total_length(), expected as u64);

        let mut buf = [0u8; 4096];
        assert_eq!(encoder.read(&mut buf)?, expected);
        assert_eq!(encoder.read(&mut buf)?, 0);
        Ok(())
    }

    #[test]
    fn buffer_size_does_not_change_output() -> io::Result<()> {
        let fs = sample_fs();
        let reference = drain(&mut sample(&fs), 1 << 16)?;
        let first_part = sample(&fs).parts().next().unwrap().encoded_len() as usize;

        for chunk in [1, 2, 7, first_part, reference.len()] {
            let mut encoder = sample(&fs);
            let out = drain(&mut encoder, chunk)?;
            assert_eq!(out, reference, "chunk size {chunk}");
            assert_eq!(out.len() as u64, encoder.total_length());
        }
        Ok(())
    }

    #[test]
    fn parts_keep_insertion_order() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        let names: Vec<_> = encoder.parts().map(|p| p.name().to_owned()).collect();
        assert_eq!(names, ["key", "file0", "type", "file1"]);

        let body = drain(&mut encoder, 512)?;
        let text = String::from_utf8_lossy(&body);
        let positions: Vec<_> = ["\"key\"", "\"file0\"", "\"type\"", "\"file1\""]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn boundary_is_fixed_once_parts_exist() {
        let mut encoder = encoder(&MemoryFs::new());
        encoder.set_boundary("other").unwrap();
        assert_eq!(encoder.total_length(), ("other".len() + 6) as u64);

        encoder.add_field("k", "v");
        assert!(matches!(
            encoder.set_boundary("again").unwrap_err(),
            Error::BoundaryAlreadyInUse
        ));
        assert_eq!(encoder.boundary(), "other");
    }

    #[test]
    fn invalid_boundary_is_rejected_and_kept() {
        let mut encoder = encoder(&MemoryFs::new());
        assert!(encoder.set_boundary("ab cd ").is_err());
        assert!(encoder.set_boundary("x".repeat(71)).is_err());
        assert_eq!(encoder.boundary(), BOUNDARY);

        let err = MultipartEncoder::with_options(EncoderOptions::default().boundary(""))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn default_boundary_is_random_hex() {
        let encoder = MultipartEncoder::new();
        assert_eq!(encoder.boundary_len(), 60);
        assert_eq!(encoder.total_length(), 66);
        assert_eq!(
            encoder.content_type(),
            format!("multipart/form-data; boundary={}", encoder.boundary())
        );
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_total() -> io::Result<()> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        encoder.set_progress(move |p: &Progress<'_>| {
            sink.lock().unwrap().push((
                p.part.map(|part| part.name().to_owned()),
                p.bytes_read,
                p.total_bytes,
                p.finished,
            ));
        });

        let total = encoder.total_length();
        drain(&mut encoder, 5)?;

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(seen.iter().all(|(_, read, t, _)| *t == total && *read <= total));

        let finishing = seen.iter().find(|(_, _, _, finished)| *finished).unwrap();
        assert_eq!(finishing.0, None);
        assert_eq!(finishing.1, total);
        Ok(())
    }

    #[test]
    fn progress_reports_read_errors() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let fs = MemoryFs::new().with_file("a.bin", b"abc");
        let mut encoder = encoder(&fs);
        encoder.set_progress(move |p: &Progress<'_>| {
            if let Some(err) = p.error {
                sink.lock().unwrap().push((p.part.unwrap().name().to_owned(), err.kind()));
            }
        });
        encoder.add_file("upload", "a.bin").unwrap();
        fs.remove("a.bin");

        let err = encoder.read(&mut [0u8; 64]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(matches!(Error::from_io(&err), Some(Error::Open { .. })));
        assert_eq!(
            *errors.lock().unwrap(),
            [("upload".to_owned(), io::ErrorKind::NotFound)]
        );
    }

    #[test]
    fn bytes_before_a_failing_part_are_delivered_first() -> io::Result<()> {
        let fs = MemoryFs::new().with_file("a.bin", b"abc");
        let mut encoder = encoder(&fs);
        encoder.add_field("key", "value");
        encoder.add_file("upload", "a.bin").unwrap();
        fs.remove("a.bin");

        let mut buf = [0u8; 4096];
        let n = encoder.read(&mut buf)?;
        assert_eq!(n, header::field_frame(BOUNDARY, "key", "value").len());
        assert!(encoder.read(&mut buf).is_err());
        assert!(encoder.read(&mut buf).is_err());
        Ok(())
    }

    #[test]
    fn missing_file_fails_when_added() {
        let mut encoder = encoder(&MemoryFs::new());
        let before = encoder.total_length();
        let err = encoder.add_file("upload", "missing.bin").unwrap_err();
        assert!(err.is_resource());
        assert!(encoder.is_empty());
        assert_eq!(encoder.total_length(), before);
    }

    #[test]
    fn parts_close_after_read_by_default() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        drain(&mut encoder, 64)?;
        assert_eq!(fs.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn keep_open_holds_handles_until_close() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        encoder.set_close_after_read(false);
        drain(&mut encoder, 64)?;
        assert_eq!(fs.open_handles(), 2);
        assert!(encoder.parts().filter(|p| p.is_open()).count() == 2);

        encoder.close().unwrap();
        assert_eq!(fs.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn close_is_idempotent_and_resets_counters() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        encoder.set_close_after_read(false);
        encoder.read(&mut [0u8; 200])?;

        encoder.close().unwrap();
        assert_eq!(encoder.total_length(), 0);
        assert_eq!(encoder.bytes_read(), 0);
        encoder.close().unwrap();

        let mut never_read = sample(&fs);
        never_read.close().unwrap();
        never_read.close().unwrap();
        Ok(())
    }

    #[test]
    fn close_attempts_every_part_and_keeps_first_error() -> io::Result<()> {
        let fs = sample_fs()
            .failing_close("/srv/a.bin")
            .failing_close("/srv/b.bin");
        let mut encoder = sample(&fs);
        encoder.set_close_after_read(false);
        drain(&mut encoder, 4096)?;
        assert_eq!(fs.open_handles(), 2);

        let err = encoder.close().unwrap_err();
        assert!(matches!(&err, Error::Close { path, .. } if path == Path::new("/srv/a.bin")));
        assert_eq!(fs.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn rewind_replays_identical_bytes() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        let first = drain(&mut encoder, 33)?;

        encoder.rewind();
        assert_eq!(encoder.bytes_read(), 0);
        assert_eq!(drain(&mut encoder, 1024)?, first);
        Ok(())
    }

    #[test]
    fn rewind_revives_a_closed_encoder() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        let total = encoder.total_length();
        let first = drain(&mut encoder, 100)?;
        encoder.close().unwrap();
        assert_eq!(drain(&mut encoder, 100)?, b"");

        encoder.rewind();
        assert_eq!(encoder.total_length(), total);
        assert_eq!(drain(&mut encoder, 100)?, first);
        Ok(())
    }

    #[test]
    fn seek_supports_only_rewinding() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);

        let err = encoder.seek(SeekFrom::Start(9999)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(encoder.stream_position()?, 0);

        let first = drain(&mut encoder, 64)?;
        let end = encoder.total_length();
        assert_eq!(encoder.stream_position()?, end);
        assert!(encoder.seek(SeekFrom::Start(1)).is_err());

        assert_eq!(encoder.seek(SeekFrom::End(-(end as i64)))?, 0);
        assert_eq!(drain(&mut encoder, 64)?, first);

        assert_eq!(encoder.seek(SeekFrom::Start(0))?, 0);
        assert_eq!(drain(&mut encoder, 64)?, first);
        Ok(())
    }

    #[test]
    fn done_encoder_keeps_returning_zero() -> io::Result<()> {
        let mut encoder = encoder(&MemoryFs::new());
        encoder.add_field("k", "v");
        drain(&mut encoder, 8)?;
        let mut buf = [0u8; 8];
        for _ in 0..3 {
            assert_eq!(encoder.read(&mut buf)?, 0);
        }
        assert_eq!(encoder.bytes_read(), encoder.total_length());
        Ok(())
    }

    #[test]
    fn empty_buffer_reads_nothing() -> io::Result<()> {
        let mut encoder = encoder(&MemoryFs::new());
        encoder.add_field("k", "v");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        encoder.set_progress(move |p| {
            sink.lock().unwrap().push((p.part.map(|part| part.name().to_owned()), p.bytes_read));
        });

        assert_eq!(encoder.read(&mut [])?, 0);
        assert_eq!(encoder.bytes_read(), 0);
        assert!(!encoder.is_done());
        assert_eq!(*calls.lock().unwrap(), [(Some("k".to_owned()), 0)]);
        Ok(())
    }

    #[test]
    fn position_query_leaves_a_closed_encoder_spent() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        drain(&mut encoder, 64)?;
        encoder.close().unwrap();
        let opens = fs.open_count("/srv/a.bin");

        assert_eq!(encoder.stream_position()?, 0);
        assert_eq!(encoder.seek(SeekFrom::Current(0))?, 0);
        assert_eq!(encoder.total_length(), 0);
        assert!(encoder.is_done());
        assert_eq!(drain(&mut encoder, 64)?, b"");
        assert_eq!(fs.open_count("/srv/a.bin"), opens);
        Ok(())
    }

    #[test]
    fn position_query_at_start_does_not_rewind() -> io::Result<()> {
        let fs = sample_fs();
        let mut encoder = sample(&fs);
        let total = encoder.total_length();
        assert_eq!(encoder.stream_position()?, 0);
        assert_eq!(encoder.total_length(), total);
        assert_eq!(drain(&mut encoder, 64)?.len() as u64, total);
        Ok(())
    }
}
