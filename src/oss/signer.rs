//! OSS header signing (the `OSS AccessKeyId:Signature` scheme).
//!
//! ```text
//! StringToSign = VERB + "\n"
//!              + Content-MD5 + "\n"
//!              + Content-Type + "\n"
//!              + Date + "\n"
//!              + CanonicalizedResource
//! Signature    = Base64(HMAC-SHA1(AccessKeySecret, StringToSign))
//! ```
//!
//! The canonicalized `x-oss-*` header block is always empty here: the proxy
//! never forwards such headers, so they are left out of the string to sign.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
use sha1::Sha1;

use super::resource::Resource;
use crate::constants::OSS_AUTH_SCHEME;
use crate::error::SignError;

type HmacSha1 = Hmac<Sha1>;

/// `Content-MD5` is not among the `http` crate's predefined names.
pub const CONTENT_MD5: &str = "content-md5";

/// Source of the current time, injectable so signatures can be pinned in tests.
pub type Clock = fn() -> DateTime<Utc>;

/// Credentials and upstream identity shared by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub upstream_scheme: String,
    pub upstream_host: String,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("upstream_scheme", &self.upstream_scheme)
            .field("upstream_host", &self.upstream_host)
            .finish()
    }
}

/// Signing capability used by the request rewriter.
///
/// Implementors provide the digest, the key id and a clock; resolving and
/// header assembly are shared so alternate implementations (such as a fixed
/// fake in tests) only swap the parts that vary.
pub trait RequestSigner: Send + Sync {
    /// Access key id placed in the Authorization header.
    fn access_key_id(&self) -> &str;

    /// Current time used for the `Date` header and presign expiry.
    fn now(&self) -> DateTime<Utc>;

    /// Compute the signature for a canonical resource string.
    ///
    /// `date_or_expires` is the `Date` header value for header signing or
    /// the unix `Expires` timestamp for presigned URLs.
    fn generate_signature(
        &self,
        method: &str,
        resource: &str,
        headers: &HeaderMap,
        date_or_expires: &str,
    ) -> Result<String, SignError>;

    /// Resolve a request path and raw query into a [`Resource`].
    fn resolve(&self, path: &str, query: Option<&str>) -> Option<Resource> {
        Resource::resolve(path, query)
    }

    /// Build the signed header set for one request.
    ///
    /// Contains `Date` and `Authorization`, plus `Content-Type` and
    /// `Content-MD5` copied from `headers` when present so the forwarded
    /// request describes its body exactly as it was signed.
    fn sign(
        &self,
        method: &str,
        resource: &Resource,
        headers: &HeaderMap,
    ) -> Result<HeaderMap, SignError> {
        let date = http_date(self.now());
        let signature = self.generate_signature(method, &resource.to_string(), headers, &date)?;

        let mut signed = HeaderMap::new();
        signed.insert(DATE, header_value("Date", &date)?);
        signed.insert(
            AUTHORIZATION,
            header_value(
                "Authorization",
                &format!(
                    "{} {}:{}",
                    OSS_AUTH_SCHEME,
                    self.access_key_id(),
                    signature
                ),
            )?,
        );

        if let Some(content_type) = non_empty(headers, CONTENT_TYPE.as_str()) {
            signed.insert(CONTENT_TYPE, content_type.clone());
        }
        if let Some(content_md5) = non_empty(headers, CONTENT_MD5) {
            signed.insert(CONTENT_MD5, content_md5.clone());
        }

        Ok(signed)
    }
}

/// HMAC-SHA1 signer holding the process-wide credentials.
#[derive(Clone)]
pub struct OssSigner {
    config: SignerConfig,
    clock: Clock,
}

impl OssSigner {
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
            clock: Utc::now,
        }
    }

    /// Replace the clock (tests pin the date to get stable signatures).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }
}

impl fmt::Debug for OssSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OssSigner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestSigner for OssSigner {
    fn access_key_id(&self) -> &str {
        &self.config.access_key_id
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn generate_signature(
        &self,
        method: &str,
        resource: &str,
        headers: &HeaderMap,
        date_or_expires: &str,
    ) -> Result<String, SignError> {
        let string_to_sign = create_string_to_sign(method, resource, headers, date_or_expires);
        let digest = hmac_sha1(
            self.config.secret_access_key.as_bytes(),
            string_to_sign.as_bytes(),
        )?;
        Ok(BASE64.encode(digest))
    }
}

/// Assemble the newline-joined string the signature is computed over.
pub fn create_string_to_sign(
    method: &str,
    resource: &str,
    headers: &HeaderMap,
    date_or_expires: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method,
        header_str(headers, CONTENT_MD5),
        header_str(headers, CONTENT_TYPE.as_str()),
        date_or_expires,
        resource
    )
}

/// Render a timestamp in IMF-fixdate form (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SignError> {
    let mut mac =
        HmacSha1::new_from_slice(key).map_err(|e| SignError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// A header worth copying: non-empty and signed as-is (non-UTF-8 values
/// sign as empty, so they must not be forwarded either).
fn non_empty<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a HeaderValue> {
    headers
        .get(name)
        .filter(|v| !v.is_empty() && v.to_str().is_ok())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, SignError> {
    HeaderValue::from_str(value).map_err(|_| SignError::InvalidHeaderValue {
        name: name.to_string(),
    })
}
