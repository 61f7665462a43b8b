//! Opaque cursor pagination over sorted token listings

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::types::{now_millis, TokenPage, TokenRecord};

/// Encodes a start offset into an opaque cursor.
///
/// The cursor carries the offset plus its issuance time; only the offset is
/// honored on decode. Cursors are not stable across re-orderings of the
/// underlying listing.
pub fn encode_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{}:{}", offset, now_millis()))
}

/// Decodes a cursor back to its start offset.
///
/// Malformed cursors decode to offset 0 rather than failing the request.
pub fn decode_cursor(cursor: &str) -> usize {
    STANDARD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|decoded| {
            decoded
                .split(':')
                .next()
                .and_then(|offset| offset.parse().ok())
        })
        .unwrap_or(0)
}

/// Slices one page out of a sorted listing.
///
/// `next_cursor` is `None` once the listing is exhausted.
pub fn paginate(tokens: &[TokenRecord], limit: usize, cursor: Option<&str>) -> TokenPage {
    let start = cursor.map(decode_cursor).unwrap_or(0).min(tokens.len());
    let end = start.saturating_add(limit).min(tokens.len());

    let next_cursor = if end < tokens.len() {
        Some(encode_cursor(end))
    } else {
        None
    };

    TokenPage {
        tokens: tokens[start..end].to_vec(),
        next_cursor,
    }
}
