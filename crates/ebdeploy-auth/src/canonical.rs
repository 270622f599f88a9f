//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The platform recomputes this string on its side and compares signatures,
//! so every component must be bit-exact. The encoded path and query produced
//! here are also the ones put on the wire.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in the request path.
///
/// Mirrors general URI escaping (reserved characters such as `/`, `:` and `@`
/// stay literal) but additionally escapes `(` and `)`, which the verifier
/// always expects escaped. `?` and `#` are escaped so the path never leaks
/// into the query or fragment.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'*')
    .remove(b'\'')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$');

/// Characters escaped in query keys and values.
///
/// Only the RFC 3986 unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`)
/// stay literal. Compared to common component encoders this also escapes
/// `'`, `(`, `)`, `!` and `*`, and `:` is never left raw.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its already-encoded components.
///
/// `headers` must already be in canonical form (see [`build_canonical_headers`]).
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     "host:examplebucket.s3.amazonaws.com",
///     "host",
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let method = method.to_ascii_uppercase();
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
    )
}

/// Percent-encode a raw request path exactly once.
///
/// Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/app/v1 (hotfix).zip"), "/app/v1%20%28hotfix%29.zip");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

/// Build the canonical query string: parameters sorted by key, with keys
/// and values encoded by [`encode_query_component`].
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::canonical::build_canonical_query_string;
///
/// let params = vec![
///     ("Version".to_owned(), "2010-12-01".to_owned()),
///     ("Action".to_owned(), "DescribeEvents".to_owned()),
/// ];
/// assert_eq!(
///     build_canonical_query_string(&params),
///     "Action=DescribeEvents&Version=2010-12-01"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(String, String)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    sorted.sort_unstable();

    sorted
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                encode_query_component(k),
                encode_query_component(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode one query key or value.
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::canonical::encode_query_component;
///
/// assert_eq!(encode_query_component("it's (a):b!*"), "it%27s%20%28a%29%3Ab%21%2A");
/// ```
#[must_use]
pub fn encode_query_component(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// Build the canonical headers block and the signed headers line.
///
/// Every header is signed. Names are lowercased and sorted; values are
/// trimmed and runs of internal whitespace collapse to a single space.
/// Repeated names are joined with commas. The headers block carries no
/// trailing newline; [`build_canonical_request`] adds the blank line.
///
/// # Examples
///
/// ```
/// use ebdeploy_auth::canonical::build_canonical_headers;
///
/// let (headers, signed) = build_canonical_headers(&[
///     ("X-Amz-Date", "20130524T000000Z"),
///     ("Host", "example.com"),
/// ]);
/// assert_eq!(headers, "host:example.com\nx-amz-date:20130524T000000Z");
/// assert_eq!(signed, "host;x-amz-date");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_ascii_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let canonical = header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let signed = header_map.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    (canonical, signed)
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
