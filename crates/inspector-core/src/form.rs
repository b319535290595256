//! Decoding of query strings, form bodies, multipart bodies, headers and
//! cookies into record fields.
//!
//! All form decoding works on bytes that were already captured, so it never
//! touches the request body stream.

use crate::error::{InspectorError, Result};
use crate::record::{param_map_from_pairs, CookiePair, FileHeader, MultipartForm, ParamMap};
use http::{header, HeaderMap, Method};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Form fields decoded from a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    /// Urlencoded fields and multipart text fields
    pub post_params: ParamMap,
    /// Multipart structure, when the body was `multipart/form-data`
    pub multipart: Option<MultipartForm>,
}

/// Media type of a `Content-Type` value, without parameters.
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Media type of the `Content-Type` header in `headers`, or an empty string.
pub fn header_media_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| media_type(ct).to_string())
        .unwrap_or_default()
}

/// Decode a raw query string. Invalid input yields an empty map.
pub fn parse_query(query: Option<&str>) -> ParamMap {
    let Some(query) = query else {
        return ParamMap::new();
    };
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => param_map_from_pairs(pairs),
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring undecodable query string");
            ParamMap::new()
        }
    }
}

/// Decode an `application/x-www-form-urlencoded` body.
pub fn parse_urlencoded(body: &[u8]) -> Result<ParamMap> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
    Ok(param_map_from_pairs(pairs))
}

/// Copy headers into a [`ParamMap`] keyed by lowercase header name.
pub fn headers_to_map(headers: &HeaderMap) -> ParamMap {
    param_map_from_pairs(
        headers
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()))),
    )
}

/// Cookies from every `Cookie` header, in order. Unparsable fragments are
/// skipped.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<CookiePair> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| cookie::Cookie::split_parse(value))
        .filter_map(|parsed| parsed.ok())
        .map(|c| CookiePair::new(c.name(), c.value()))
        .collect()
}

/// Decode the form fields of a captured body.
///
/// Urlencoded bodies are decoded for POST, PUT and PATCH. Multipart bodies
/// are decoded for any method; their text fields are also added to
/// `post_params`. Malformed bodies produce empty fields.
pub fn extract_form(method: &Method, headers: &HeaderMap, body: &[u8]) -> FormFields {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return FormFields::default();
    };

    let media = media_type(content_type).to_ascii_lowercase();
    let result = if media == FORM_URLENCODED {
        if matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
            parse_urlencoded(body).map(|post_params| FormFields {
                post_params,
                multipart: None,
            })
        } else {
            Ok(FormFields::default())
        }
    } else if media == MULTIPART_FORM_DATA {
        extract_boundary(content_type)
            .ok_or_else(|| InspectorError::Multipart("missing boundary".to_string()))
            .and_then(|boundary| parse_multipart(body, &boundary))
            .map(|form| FormFields {
                post_params: form.value.clone(),
                multipart: Some(form),
            })
    } else {
        Ok(FormFields::default())
    };

    result.unwrap_or_else(|err| {
        tracing::debug!(error = %err, content_type = %content_type, "Ignoring undecodable form body");
        FormFields::default()
    })
}

/// Extract the boundary parameter of a multipart `Content-Type`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            (!boundary.is_empty()).then(|| boundary.to_string())
        } else {
            None
        }
    })
}

/// Parse a `multipart/form-data` body into text fields and file metadata.
///
/// File contents are measured, not stored. Parts without a field name are
/// skipped.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<MultipartForm> {
    let delimiter = format!("--{}", boundary);
    let delimiter = delimiter.as_bytes();

    let mut form = MultipartForm::default();
    let mut cursor = find(body, delimiter, 0)
        .ok_or_else(|| InspectorError::Multipart("boundary not found".to_string()))?
        + delimiter.len();

    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            return Ok(form);
        }
        let part_start = cursor + line_break_len(rest);
        let part_end = find(body, delimiter, part_start)
            .ok_or_else(|| InspectorError::Multipart("unterminated part".to_string()))?;

        add_part(&mut form, trim_trailing_line_break(&body[part_start..part_end]))?;
        cursor = part_end + delimiter.len();
    }
}

fn add_part(form: &mut MultipartForm, part: &[u8]) -> Result<()> {
    let (head, content) = split_head(part)
        .ok_or_else(|| InspectorError::Multipart("part without header block".to_string()))?;

    let head = String::from_utf8_lossy(head);
    let mut headers = ParamMap::new();
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in head.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "content-disposition" => {
                for param in value.split(';').skip(1) {
                    if let Some((k, v)) = param.split_once('=') {
                        let v = v.trim().trim_matches('"').to_string();
                        let k = k.trim();
                        if k.eq_ignore_ascii_case("name") {
                            name = Some(v);
                        } else if k.eq_ignore_ascii_case("filename") {
                            filename = Some(v);
                        }
                    }
                }
            }
            "content-type" => content_type = Some(value.to_string()),
            _ => {}
        }
        headers.entry(key).or_default().push(value.to_string());
    }

    let Some(name) = name else {
        return Ok(());
    };

    match filename {
        Some(filename) if !filename.is_empty() => {
            form.file.entry(name).or_default().push(FileHeader {
                filename,
                content_type,
                size: content.len(),
                headers,
            })
        }
        _ => form
            .value
            .entry(name)
            .or_default()
            .push(String::from_utf8_lossy(content).into_owned()),
    }
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn line_break_len(bytes: &[u8]) -> usize {
    if bytes.starts_with(b"\r\n") {
        2
    } else if bytes.starts_with(b"\n") {
        1
    } else {
        0
    }
}

fn trim_trailing_line_break(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_suffix(b"\r\n")
        .or_else(|| bytes.strip_suffix(b"\n"))
        .unwrap_or(bytes)
}

fn split_head(part: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = find(part, b"\r\n\r\n", 0) {
        return Some((&part[..pos], &part[pos + 4..]));
    }
    find(part, b"\n\n", 0).map(|pos| (&part[..pos], &part[pos + 2..]))
}
