//! Minimal `multipart/form-data` parsing over a fully-read request body.

/// One form part: its disposition parameters, declared type and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
/// Returns `None` for any other media type.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';').map(str::trim);
    let media_type = params.next()?;
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .find_map(|p| header_param(p, "boundary"))
        .filter(|b| !b.is_empty())
}

/// Parses every part of a multipart body. Preamble, epilogue and pieces
/// without a header/body separator are skipped.
pub fn parse_parts(body: &[u8], boundary: &str) -> Vec<Part> {
    let delimiter = format!("--{}", boundary);
    let sep = b"\r\n\r\n";

    split_on(body, delimiter.as_bytes())
        .into_iter()
        .skip(1)
        .filter(|piece| !piece.starts_with(b"--"))
        .filter_map(|piece| {
            let piece = piece.strip_prefix(b"\r\n").unwrap_or(piece);
            let sep_pos = find_subsequence(piece, sep)?;
            let headers = String::from_utf8_lossy(&piece[..sep_pos]);
            let raw = &piece[sep_pos + sep.len()..];
            let data = raw.strip_suffix(b"\r\n").unwrap_or(raw);

            let mut part = Part {
                name: None,
                filename: None,
                content_type: None,
                data: data.to_vec(),
            };
            for line in headers.split("\r\n") {
                let Some((key, value)) = line.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                if key.trim().eq_ignore_ascii_case("content-disposition") {
                    for param in value.split(';').map(str::trim) {
                        if let Some(v) = header_param(param, "name") {
                            part.name = Some(v);
                        } else if let Some(v) = header_param(param, "filename") {
                            part.filename = Some(v);
                        }
                    }
                } else if key.trim().eq_ignore_ascii_case("content-type") && !value.is_empty() {
                    part.content_type = Some(value.to_string());
                }
            }
            Some(part)
        })
        .collect()
}

/// The first part whose form field name is `field_name`.
pub fn find_part(body: &[u8], boundary: &str, field_name: &str) -> Option<Part> {
    parse_parts(body, boundary)
        .into_iter()
        .find(|p| p.name.as_deref() == Some(field_name))
}

/// `key=value` or `key="value"` (key compared case-insensitively).
fn header_param(param: &str, key: &str) -> Option<String> {
    let (k, v) = param.split_once('=')?;
    if !k.trim().eq_ignore_ascii_case(key) {
        return None;
    }
    Some(v.trim().trim_matches('"').to_string())
}
