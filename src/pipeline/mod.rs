// Request pipeline module - per-request state carried across Pingora phases

use std::time::Instant;

use uuid::Uuid;

use crate::proxy::rewrite::UpstreamRequest;

/// Request context that holds everything learned about a request as it
/// moves from `request_filter` to `upstream_peer`, the upstream filters
/// and finally `logging`.
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    raw_query: Option<String>,
    started_at: Instant,
    upstream: Option<UpstreamRequest>,
    patch_delete_result: bool,
}

impl RequestContext {
    /// Create a new RequestContext with a fresh UUID v4 request ID
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: String::new(),
            path: String::new(),
            raw_query: None,
            started_at: Instant::now(),
            upstream: None,
            patch_delete_result: false,
        }
    }

    /// Record the inbound request line
    pub fn set_request(&mut self, method: &str, path: &str, raw_query: Option<&str>) {
        self.method = method.to_string();
        self.path = path.to_string();
        self.raw_query = raw_query.map(str::to_string);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }

    /// Store the rewritten request produced during `request_filter`
    pub fn set_upstream(&mut self, upstream: UpstreamRequest) {
        self.upstream = Some(upstream);
    }

    pub fn upstream(&self) -> Option<&UpstreamRequest> {
        self.upstream.as_ref()
    }

    /// Bucket the request resolved to, if it got that far
    pub fn bucket(&self) -> Option<&str> {
        self.upstream.as_ref().map(|u| u.resource.bucket_name.as_str())
    }

    pub fn set_patch_delete_result(&mut self, patch: bool) {
        self.patch_delete_result = patch;
    }

    /// Whether the response body must be replaced with an empty DeleteResult
    pub fn patch_delete_result(&self) -> bool {
        self.patch_delete_result
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
