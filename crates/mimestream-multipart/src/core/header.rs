use std::path::Path;

/// Content type announced for every file part.
pub const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Bytes appended after the file content of a file part.
pub const CRLF: &[u8] = b"\r\n";

/// Escape backslashes and double quotes for use inside a quoted header value.
pub fn escape_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == '"' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// The full frame of a field part: boundary, disposition, value and closing CRLF.
pub fn field_frame(boundary: &str, name: &str, value: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{value}\r\n",
        escape_quotes(name)
    )
}

/// The preamble of a file part, up to and including the blank line before content.
pub fn file_header(boundary: &str, name: &str, file_name: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
         Content-Type: {FILE_CONTENT_TYPE}\r\n\r\n",
        escape_quotes(name),
        escape_quotes(file_name)
    )
}

/// The closing delimiter of the whole body.
pub fn terminator(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

/// Bytes the terminator adds on top of the boundary itself.
pub const TERMINATOR_OVERHEAD: usize = 6;

/// Base name of `path` with directory components stripped.
pub fn base_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}
