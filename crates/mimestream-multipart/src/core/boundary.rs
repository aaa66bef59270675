use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Number of random bytes behind a generated boundary (hex doubles it).
pub const RANDOM_BOUNDARY_BYTES: usize = 30;

/// Longest boundary allowed by RFC 2046 section 5.1.1.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Characters that force the boundary parameter to be quoted (RFC 2045 tspecials plus space).
const TSPECIALS: &[u8] = b"()<>@,;:\\\"/[]?= ";

/// Generate a fresh boundary from the operating system's secure random source.
///
/// The result is always 60 lowercase hex characters.
pub fn generate() -> String {
    let mut buf = [0u8; RANDOM_BOUNDARY_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Check a caller-supplied boundary against the RFC 2046 grammar.
///
/// Space is allowed anywhere except as the final character.
pub fn validate(boundary: &str) -> Result<()> {
    let bytes = boundary.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_BOUNDARY_LEN {
        return Err(Error::InvalidBoundaryLength { len: bytes.len() });
    }

    let last = bytes.len() - 1;
    for (index, ch) in boundary.char_indices() {
        let legal = match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' => true,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' => true,
            ' ' => index != last,
            _ => false,
        };
        if !legal {
            return Err(Error::InvalidBoundaryChar { ch, index });
        }
    }
    Ok(())
}

/// Render the `Content-Type` header value for a form-data body.
pub fn content_type(boundary: &str) -> String {
    if boundary.bytes().any(|b| TSPECIALS.contains(&b)) {
        format!(
            "multipart/form-data; boundary=\"{}\"",
            super::header::escape_quotes(boundary)
        )
    } else {
        format!("multipart/form-data; boundary={boundary}")
    }
}
