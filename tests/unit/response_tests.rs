// Response normalizer tests for quiet-mode multi-object delete

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use pingora_http::ResponseHeader;

use oss_proxy::constants::EMPTY_DELETE_RESULT;
use oss_proxy::proxy::response::{
    apply_delete_result_patch, delete_result_body, discard_upstream_body,
    needs_delete_result_patch,
};

fn upstream_response(content_length: &str) -> ResponseHeader {
    let mut response = ResponseHeader::build(200, None).unwrap();
    response
        .insert_header(CONTENT_LENGTH, content_length.to_string())
        .unwrap();
    response
}

#[test]
fn test_empty_quiet_delete_gets_delete_result_body() {
    let mut response = upstream_response("0");
    assert!(needs_delete_result_patch("POST", Some("delete"), &response.headers));

    apply_delete_result_patch(&mut response).unwrap();

    assert_eq!(
        delete_result_body(),
        Bytes::from_static(
            br#"<?xml version="1.0" encoding="UTF-8"?><DeleteResult></DeleteResult>"#
        )
    );
    assert_eq!(response.headers.get(CONTENT_TYPE).unwrap(), "application/xml");
    assert!(response.headers.get(CONTENT_LENGTH).is_none());
    assert_eq!(response.headers.get(TRANSFER_ENCODING).unwrap(), "chunked");
}

#[test]
fn test_non_empty_delete_response_passes_through() {
    let response = upstream_response("231");
    assert!(!needs_delete_result_patch("POST", Some("delete"), &response.headers));
}

#[test]
fn test_other_operations_pass_through() {
    let response = upstream_response("0");
    assert!(!needs_delete_result_patch("PUT", Some("delete"), &response.headers));
    assert!(!needs_delete_result_patch("POST", Some("uploads"), &response.headers));
    assert!(!needs_delete_result_patch("POST", Some(""), &response.headers));
}

#[test]
fn test_chunked_upstream_response_is_not_patched() {
    let mut headers = HeaderMap::new();
    headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    assert!(!needs_delete_result_patch("POST", Some("delete"), &headers));
}

#[test]
fn test_stray_upstream_chunks_are_discarded() {
    let mut body = Some(Bytes::from_static(b"<partial"));
    discard_upstream_body(&mut body);
    assert!(body.is_none());
    assert_eq!(delete_result_body(), EMPTY_DELETE_RESULT.as_bytes());
}
