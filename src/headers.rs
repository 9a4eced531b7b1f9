//! Header collapsing.
//!
//! HTTP allows a header name to appear more than once. The broker message
//! carries one value per name, so the inbound collection is collapsed by
//! keeping the first value seen for each name. Later duplicates are dropped,
//! not joined.

use axum::http::HeaderMap;

use crate::message::MessageHeaders;

/// Collapse a multi-valued header map into a single-valued mapping.
///
/// Names are rewritten in canonical MIME form (see [`canonical_name`]).
pub fn collapse(headers: &HeaderMap) -> MessageHeaders {
    let mut collapsed = MessageHeaders::new();

    for name in headers.keys() {
        // `get` returns the first value stored under the name
        if let Some(value) = headers.get(name) {
            collapsed.insert(
                canonical_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }

    collapsed
}

/// Canonical MIME form of a header name.
///
/// The first letter and any letter following a hyphen are upper-cased, the
/// rest lower-cased: `x-gitcode-event` becomes `X-Gitcode-Event`. Names that
/// contain a space or a non-ASCII byte are returned unchanged.
pub fn canonical_name(name: &str) -> String {
    if name.bytes().any(|b| b == b' ' || !b.is_ascii()) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
