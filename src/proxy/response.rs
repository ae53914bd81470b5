//! Response normalization.
//!
//! A quiet-mode multi-object delete (`POST /{bucket}/?delete`) can come back
//! from the upstream with an empty body, while clients expect at least an
//! empty `<DeleteResult>` document. An upstream `Content-Length: 0` ends the
//! body together with the header, so the document is written right after
//! the patched header instead of waiting for a body chunk that never comes.

use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use pingora_core::Result;
use pingora_http::ResponseHeader;

use crate::constants::EMPTY_DELETE_RESULT;

/// Whether a response needs the empty DeleteResult body.
///
/// True only for `POST` with raw query exactly `delete` and a response
/// `Content-Length` of `0`.
pub fn needs_delete_result_patch(
    method: &str,
    raw_query: Option<&str>,
    response_headers: &HeaderMap,
) -> bool {
    method == "POST"
        && raw_query == Some("delete")
        && response_headers
            .get(CONTENT_LENGTH)
            .is_some_and(|v| v.as_bytes() == b"0")
}

/// Rewrite response headers for the synthesized body.
///
/// `Content-Length` no longer matches, so the body is sent chunked.
pub fn apply_delete_result_patch(response: &mut ResponseHeader) -> Result<()> {
    response.remove_header(&CONTENT_LENGTH);
    response.insert_header(CONTENT_TYPE, "application/xml")?;
    response.insert_header(TRANSFER_ENCODING, "chunked")?;
    Ok(())
}

/// The document sent in place of the empty upstream body
pub fn delete_result_body() -> Bytes {
    Bytes::from_static(EMPTY_DELETE_RESULT.as_bytes())
}

/// Drop an upstream body chunk once the document has been sent
pub fn discard_upstream_body(body: &mut Option<Bytes>) {
    *body = None;
}
