//! Upstream endpoint configuration.
//!
//! The upstream is addressed virtual-hosted style: every request goes to
//! `{bucket}.{host}`, so only the scheme and the bare endpoint host (with an
//! optional port) are configured here.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_UPSTREAM_HOST, DEFAULT_UPSTREAM_SCHEME, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};

fn default_scheme() -> String {
    DEFAULT_UPSTREAM_SCHEME.to_string()
}

fn default_host() -> String {
    DEFAULT_UPSTREAM_HOST.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Endpoint authority, e.g. `oss-cn-hangzhou.aliyuncs.com` or `localhost:9000`
    #[serde(default = "default_host")]
    pub host: String,
    /// Connect/read/write timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            timeout: default_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// Build from an endpoint URL such as `https://oss-cn-hangzhou.aliyuncs.com`.
    ///
    /// Returns `None` when the URL lacks a scheme or an authority.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        let uri = endpoint.trim().parse::<http::Uri>().ok()?;
        let scheme = uri.scheme_str()?;
        let authority = uri.authority()?;

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: authority.as_str().to_string(),
            timeout: default_timeout(),
        })
    }

    pub fn use_tls(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }

    /// Authority of the upstream for a bucket: `{bucket}.{host}`
    pub fn bucket_authority(&self, bucket: &str) -> String {
        format!("{}.{}", bucket, self.host)
    }

    /// Split the configured host into hostname and port, defaulting the
    /// port from the scheme.
    pub fn host_and_port(&self) -> (&str, u16) {
        let default_port = if self.use_tls() { 443 } else { 80 };
        match self.host.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, port),
                Err(_) => (self.host.as_str(), default_port),
            },
            None => (self.host.as_str(), default_port),
        }
    }
}
