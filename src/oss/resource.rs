//! Resource resolution.
//!
//! Turns an inbound path and query string into the bucket, object key and
//! canonical sub-resource string that OSS signs over.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use super::subresource::is_signed_sub_resource;

/// Canonical identity of the bucket/object a request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub bucket_name: String,
    pub object_name: String,
    /// Sorted, escaped `key[=value]` pairs joined by `&`. Empty when the
    /// request carries no signed sub-resources.
    pub sub_resource: String,
}

impl Resource {
    /// Resolve a request path (as received, percent-encoded) and raw query.
    ///
    /// Returns `None` for paths that do not contain a bucket segment
    /// followed by an object segment (fewer than two `/`).
    pub fn resolve(path: &str, query: Option<&str>) -> Option<Self> {
        let decoded = decode_path(path);
        let (bucket, object) = split_bucket_path(&decoded)?;

        Some(Resource {
            bucket_name: bucket.to_string(),
            object_name: object.to_string(),
            sub_resource: canonical_sub_resource(query),
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.bucket_name, self.object_name)?;
        if !self.sub_resource.is_empty() {
            write!(f, "?{}", self.sub_resource)?;
        }
        Ok(())
    }
}

/// Split `/bucket/object/key` into `("bucket", "object/key")`.
///
/// Everything after the bucket segment is the object name, slashes
/// included. The object may be empty (`/bucket/`).
pub fn split_bucket_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix('/')?;
    rest.split_once('/')
}

/// Build the canonical sub-resource string from a raw query.
///
/// Only allow-listed keys survive; they are sorted ascending, values are
/// query-escaped and empty values render as a bare key. When a key repeats,
/// its first value wins.
pub fn canonical_sub_resource(query: Option<&str>) -> String {
    let mut signed: BTreeMap<String, String> = BTreeMap::new();

    for (key, value) in parse_query(query.unwrap_or_default()) {
        if is_signed_sub_resource(&key) {
            signed.entry(key).or_insert(value);
        }
    }

    signed
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{}={}", key, query_escape(value))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a raw query string into decoded key/value pairs, in order.
///
/// A pair without `=` yields an empty value. Empty segments are skipped.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (query_unescape(key), query_unescape(value))
        })
        .collect()
}

/// Form-style escaping: unreserved characters pass through, space becomes
/// `+`, everything else is percent-encoded.
pub fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

fn query_unescape(value: &str) -> String {
    let spaced = value.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map(Cow::into_owned).ok();
    decoded.unwrap_or(spaced)
}

/// Percent-decode a request path. Invalid UTF-8 leaves it untouched.
///
/// Routing and resolving both work on this form so an encoded `/`
/// counts as a segment separator in both.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

/// Escape an object name for the request line, segment by segment.
///
/// `/` stays a separator; everything else outside the unreserved set is
/// percent-encoded (space becomes `%20`).
pub fn escape_object_path(object_name: &str) -> String {
    object_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
