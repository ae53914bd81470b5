//! Presigned URLs for redirect mode.
//!
//! Instead of forwarding, the proxy can answer with a 307 pointing at a URL
//! that carries its own credentials in the query string:
//! `OSSAccessKeyId`, `Expires` (unix seconds) and `Signature`, where the
//! signature uses `Expires` in place of the `Date` line.

use chrono::Duration;
use http::HeaderMap;

use super::resource::{escape_object_path, query_escape, Resource};
use super::signer::RequestSigner;
use crate::error::SignError;

/// Build a presigned upstream URL for `resource`.
///
/// The object name is escaped for the URL path; `raw_query` is carried
/// over ahead of the signature parameters.
pub fn presigned_url(
    signer: &dyn RequestSigner,
    scheme: &str,
    upstream_host: &str,
    method: &str,
    resource: &Resource,
    raw_query: Option<&str>,
    headers: &HeaderMap,
    expires_in_secs: i64,
) -> Result<String, SignError> {
    let expires = (signer.now() + Duration::seconds(expires_in_secs))
        .timestamp()
        .to_string();
    let signature =
        signer.generate_signature(method, &resource.to_string(), headers, &expires)?;

    let mut query = String::new();
    if let Some(raw) = raw_query.filter(|q| !q.is_empty()) {
        query.push_str(raw);
        query.push('&');
    }
    query.push_str(&format!(
        "OSSAccessKeyId={}&Expires={}&Signature={}",
        query_escape(signer.access_key_id()),
        expires,
        query_escape(&signature)
    ));

    Ok(format!(
        "{}://{}.{}/{}?{}",
        scheme,
        resource.bucket_name,
        upstream_host,
        escape_object_path(&resource.object_name),
        query
    ))
}
