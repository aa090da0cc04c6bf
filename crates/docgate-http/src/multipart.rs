//! `multipart/form-data` parser.
//!
//! Splits an already-buffered body into its parts, in wire order. A part that
//! carries a `filename` in its `Content-Disposition` is a file attachment;
//! every other part is a plain form field.

use bytes::Bytes;
use docgate_model::error::DocGateError;
use docgate_model::keys::MULTIPART;

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Field name from `Content-Disposition`.
    pub name: String,
    /// File name, present for file attachments.
    pub filename: Option<String>,
    /// The part's own `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Raw part content.
    pub data: Bytes,
}

impl FormPart {
    /// Whether this part is a file attachment.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// The part content as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Extract the boundary string from a `Content-Type: multipart/form-data; boundary=...` header.
pub fn extract_boundary(content_type: &str) -> Result<String, DocGateError> {
    if !content_type.to_ascii_lowercase().starts_with(MULTIPART) {
        return Err(DocGateError::unsupported_media_type(content_type));
    }

    for part in content_type.split(';') {
        let trimmed = part.trim();
        let Some((key, val)) = trimmed.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = val.trim().trim_matches('"').to_owned();
            if boundary.is_empty() {
                return Err(DocGateError::bad_content("Empty boundary in Content-Type"));
            }
            return Ok(boundary);
        }
    }

    Err(DocGateError::bad_content("Missing boundary in Content-Type"))
}

/// Parse a multipart/form-data body into its parts.
///
/// Parts without a `name` are skipped. Anything after the closing delimiter
/// is ignored.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<FormPart>, DocGateError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let delimiter = format!("--{boundary}");
    let Some(first) = find_bytes(body, delimiter.as_bytes()) else {
        return Err(DocGateError::bad_content(
            "Malformed multipart body: boundary not found",
        ));
    };

    // Every delimiter after the first is preceded by CRLF.
    let separator = format!("\r\n{delimiter}");
    let mut rest = &body[first + delimiter.len()..];
    let mut parts = Vec::new();

    while !rest.starts_with(b"--") {
        let part_start = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        let (raw, next) = match find_bytes(part_start, separator.as_bytes()) {
            Some(pos) => (
                &part_start[..pos],
                &part_start[pos + separator.len()..],
            ),
            None => (part_start, &b"--"[..]),
        };
        if let Some(part) = parse_part(raw) {
            parts.push(part);
        }
        rest = next;
    }

    Ok(parts)
}

/// Parse one part (headers, blank line, content).
fn parse_part(raw: &[u8]) -> Option<FormPart> {
    let pos = find_bytes(raw, b"\r\n\r\n")?;
    let headers = PartHeaders::parse(&raw[..pos]);
    Some(FormPart {
        name: headers.name?,
        filename: headers.filename,
        content_type: headers.content_type,
        data: Bytes::copy_from_slice(&raw[pos + 4..]),
    })
}

/// The part headers the decoder cares about.
#[derive(Debug, Default)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
}

impl PartHeaders {
    fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut headers = Self::default();

        for line in text.split("\r\n") {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("content-type") {
                headers.content_type = Some(value.trim().to_owned());
            } else if key.eq_ignore_ascii_case("content-disposition") {
                for param in value.split(';').skip(1) {
                    let Some((k, v)) = param.split_once('=') else {
                        continue;
                    };
                    let v = v.trim().trim_matches('"').to_owned();
                    match k.trim().to_ascii_lowercase().as_str() {
                        "name" => headers.name = Some(v),
                        "filename" => headers.filename = Some(v),
                        _ => {}
                    }
                }
            }
        }

        headers
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
