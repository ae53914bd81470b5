//! Request rewriting.
//!
//! Turns an inbound `/{bucket}/{object}` request into the request the
//! upstream receives: virtual-hosted authority, object-only path, the
//! original raw query, signed headers plus allow-listed pass-through
//! headers.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, HOST, RANGE};
use http::header::TRANSFER_ENCODING;
use http::Uri;
use pingora_http::RequestHeader;

use crate::config::UpstreamConfig;
use crate::constants::{DEFAULT_PRESIGN_EXPIRES_SECS, PASS_THROUGH_HEADERS, RANGE_UPPER_BOUND};
use crate::error::RewriteError;
use crate::oss::{escape_object_path, presigned_url, RequestSigner, Resource};

/// Outbound request produced by [`RequestRewriter::rewrite`]
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Resolved bucket/object the request was signed for
    pub resource: Resource,
    /// `{bucket}.{upstream host}`
    pub authority: String,
    /// Origin-form URI sent upstream: `/{object}[?rawQuery]`
    pub uri: Uri,
    /// Signed headers merged with pass-through headers
    pub headers: HeaderMap,
}

/// Rewrites inbound requests for the configured upstream
#[derive(Clone)]
pub struct RequestRewriter {
    signer: Arc<dyn RequestSigner>,
    upstream: UpstreamConfig,
}

impl fmt::Debug for RequestRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestRewriter")
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}

impl RequestRewriter {
    pub fn new(signer: Arc<dyn RequestSigner>, upstream: UpstreamConfig) -> Self {
        Self { signer, upstream }
    }

    pub fn upstream(&self) -> &UpstreamConfig {
        &self.upstream
    }

    /// Rewrite one request.
    ///
    /// `raw_path` is the path as received (still percent-encoded). Returns
    /// `Ok(None)` when the decoded path does not name a bucket and an
    /// object. The forwarded path is the decoded object name re-escaped.
    ///
    /// # Errors
    ///
    /// Fails if signing fails or the rewritten URI cannot be built; the
    /// request must then not be forwarded.
    pub fn rewrite(
        &self,
        method: &str,
        raw_path: &str,
        raw_query: Option<&str>,
        inbound: &HeaderMap,
    ) -> Result<Option<UpstreamRequest>, RewriteError> {
        let Some(resource) = self.signer.resolve(raw_path, raw_query) else {
            return Ok(None);
        };

        let uri = object_uri(&resource.object_name, raw_query)?;
        let signed = self.signer.sign(method, &resource, inbound)?;
        let headers = merge_pass_through(signed, inbound);
        let authority = self.upstream.bucket_authority(&resource.bucket_name);

        Ok(Some(UpstreamRequest {
            resource,
            authority,
            uri,
            headers,
        }))
    }

    /// Build a presigned upstream URL for redirect mode.
    ///
    /// Only `Content-Type` from the inbound request takes part in the
    /// signature; a browser following the redirect sends no `Content-MD5`.
    pub fn presign(
        &self,
        method: &str,
        raw_path: &str,
        raw_query: Option<&str>,
        inbound: &HeaderMap,
    ) -> Result<Option<String>, RewriteError> {
        let Some(resource) = self.signer.resolve(raw_path, raw_query) else {
            return Ok(None);
        };

        let mut signed_headers = HeaderMap::new();
        if let Some(content_type) = inbound.get(http::header::CONTENT_TYPE) {
            signed_headers.insert(http::header::CONTENT_TYPE, content_type.clone());
        }

        let url = presigned_url(
            self.signer.as_ref(),
            &self.upstream.scheme,
            &self.upstream.host,
            method,
            &resource,
            raw_query,
            &signed_headers,
            DEFAULT_PRESIGN_EXPIRES_SECS,
        )?;
        Ok(Some(url))
    }
}

/// Strip the explicit upper bound some clients send for open-ended ranges.
///
/// `bytes=100-9223372036854775806` becomes `bytes=100-`; anything else is
/// returned unchanged.
pub fn fix_range(value: &str) -> &str {
    match value.strip_suffix(RANGE_UPPER_BOUND) {
        Some(open) if open.ends_with('-') => open,
        _ => value,
    }
}

/// Overlay allow-listed inbound headers onto the signed set.
///
/// Pass-through values win over signed values of the same name; empty
/// values are skipped.
pub fn merge_pass_through(mut signed: HeaderMap, inbound: &HeaderMap) -> HeaderMap {
    for name in PASS_THROUGH_HEADERS {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Some(value) = inbound.get(&name) else {
            continue;
        };

        let value = if name == RANGE {
            match value.to_str() {
                Ok(range) => match HeaderValue::from_str(fix_range(range)) {
                    Ok(fixed) => fixed,
                    Err(_) => continue,
                },
                Err(_) => value.clone(),
            }
        } else {
            value.clone()
        };

        if !value.is_empty() {
            signed.insert(name, value);
        }
    }
    signed
}

/// Turn the request Pingora is about to send into the rewritten one.
///
/// Every inbound header except body framing (`Content-Length`,
/// `Transfer-Encoding`) is dropped, the outbound set is inserted, `Host`
/// becomes the bucket authority and the URI is replaced.
pub fn apply_upstream_request(
    upstream: &UpstreamRequest,
    request: &mut RequestHeader,
) -> pingora_core::Result<()> {
    let dropped: Vec<HeaderName> = request
        .headers
        .keys()
        .filter(|name| **name != CONTENT_LENGTH && **name != TRANSFER_ENCODING)
        .cloned()
        .collect();
    for name in &dropped {
        request.remove_header(name);
    }

    for (name, value) in upstream.headers.iter() {
        request.insert_header(name.clone(), value.clone())?;
    }
    request.insert_header(HOST, upstream.authority.as_str())?;
    request.set_uri(upstream.uri.clone());

    Ok(())
}

fn object_uri(object_name: &str, raw_query: Option<&str>) -> Result<Uri, RewriteError> {
    let object_path = escape_object_path(object_name);
    let uri = match raw_query.filter(|q| !q.is_empty()) {
        Some(query) => format!("/{}?{}", object_path, query),
        None => format!("/{}", object_path),
    };
    uri.parse::<Uri>().map_err(|e| RewriteError::InvalidUri {
        uri,
        reason: e.to_string(),
    })
}
