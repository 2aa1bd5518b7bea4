//! Request handlers.

pub mod interviews;
pub mod result;
pub mod update;

use axum::http::header;
use axum::http::HeaderMap;

use crate::response::OCTET_STREAM;

/// Whether the client asked for the binary blob response format.
pub(crate) fn wants_octet_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.eq_ignore_ascii_case(OCTET_STREAM))
}
