// Proxy module - Pingora ProxyHttp implementation
// Signs and forwards bucket/object requests to the OSS upstream

pub mod response;
pub mod rewrite;
pub mod routing;
pub mod special_endpoints;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorType, Result};
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};

use crate::config::{Config, SignMode, UpstreamConfig};
use crate::oss::{decode_path, OssSigner, RequestSigner};
use crate::pipeline::RequestContext;

use response::{
    apply_delete_result_patch, delete_result_body, discard_upstream_body, needs_delete_result_patch,
};
use rewrite::{apply_upstream_request, RequestRewriter};
use routing::{classify, Route};
use special_endpoints::EndpointResponse;

/// Response header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// OssProxy implements the Pingora ProxyHttp trait.
/// Answers health checks locally, signs resource requests and relays them
/// to `{bucket}.{upstream host}` (or redirects to a presigned URL).
pub struct OssProxy {
    rewriter: RequestRewriter,
    sign_mode: SignMode,
}

impl OssProxy {
    /// Create a proxy signing with the configured credentials
    pub fn new(config: &Config) -> Self {
        let signer = Arc::new(OssSigner::new(config.signer_config()));
        Self::with_signer(config, signer)
    }

    /// Create a proxy with an explicit signer (tests use a fixed one)
    pub fn with_signer(config: &Config, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            rewriter: RequestRewriter::new(signer, config.upstream.clone()),
            sign_mode: config.sign_mode,
        }
    }

    pub fn sign_mode(&self) -> SignMode {
        self.sign_mode
    }

    pub fn upstream(&self) -> &UpstreamConfig {
        self.rewriter.upstream()
    }

    /// Decide how a request is answered without touching the session.
    ///
    /// `path` is the raw request path; routing and resolving both look at
    /// its percent-decoded form.
    ///
    /// `Some(response)` is written back directly; `None` means the request
    /// was rewritten into `ctx` and continues to the upstream.
    pub fn handle_request(
        &self,
        method: &str,
        path: &str,
        raw_query: Option<&str>,
        headers: &http::HeaderMap,
        ctx: &mut RequestContext,
    ) -> Option<EndpointResponse> {
        match classify(&decode_path(path)) {
            Route::Health => return Some(EndpointResponse::ok()),
            Route::NotFound => return Some(EndpointResponse::not_found()),
            Route::Resource => {}
        }

        match self.sign_mode {
            SignMode::Redirect => match self.rewriter.presign(method, path, raw_query, headers) {
                Ok(Some(url)) => Some(EndpointResponse::redirect(url)),
                Ok(None) => Some(EndpointResponse::not_found()),
                Err(e) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        path = %path,
                        error = %e,
                        "Failed to presign request"
                    );
                    Some(EndpointResponse::internal_error("request signing failed"))
                }
            },
            SignMode::Proxy => match self.rewriter.rewrite(method, path, raw_query, headers) {
                Ok(Some(upstream)) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        bucket = %upstream.resource.bucket_name,
                        object = %upstream.resource.object_name,
                        sub_resource = %upstream.resource.sub_resource,
                        authority = %upstream.authority,
                        "Signed request for upstream"
                    );
                    ctx.set_upstream(upstream);
                    None
                }
                Ok(None) => Some(EndpointResponse::not_found()),
                Err(e) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        path = %path,
                        error = %e,
                        "Failed to sign request"
                    );
                    Some(EndpointResponse::internal_error("request signing failed"))
                }
            },
        }
    }

    /// Write a locally generated response and finish the request
    async fn respond(
        &self,
        session: &mut Session,
        response: EndpointResponse,
        ctx: &RequestContext,
    ) -> Result<()> {
        let mut header = ResponseHeader::build(response.status, None)?;
        if let Some(content_type) = response.content_type {
            header.insert_header("Content-Type", content_type)?;
        }
        if let Some(location) = response.location {
            header.insert_header("Location", location)?;
        }
        header.insert_header("Content-Length", response.body.len().to_string())?;
        header.insert_header(REQUEST_ID_HEADER, ctx.request_id())?;

        let has_body = !response.body.is_empty();
        session
            .write_response_header(Box::new(header), !has_body)
            .await?;
        if has_body {
            session
                .write_response_body(Some(response.body), true)
                .await?;
        }
        Ok(())
    }

    fn get_client_ip(&self, session: &Session) -> String {
        // X-Forwarded-For: "client, proxy1, proxy2"
        if let Some(client_ip) = session
            .req_header()
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
        {
            return client_ip.trim().to_string();
        }

        session
            .client_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn missing_upstream() -> Box<Error> {
    Error::explain(
        ErrorType::InternalError,
        "No rewritten upstream request in context",
    )
}

#[async_trait]
impl ProxyHttp for OssProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Routing pre-check, resource resolution and signing
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let method = req.method.as_str().to_string();
        let path = req.uri.path().to_string();
        let raw_query = req.uri.query().map(str::to_string);
        let headers = req.headers.clone();

        ctx.set_request(&method, &path, raw_query.as_deref());

        match self.handle_request(&method, &path, raw_query.as_deref(), &headers, ctx) {
            Some(response) => {
                self.respond(session, response, ctx).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Virtual-hosted upstream peer for the resolved bucket
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let bucket = ctx.bucket().ok_or_else(missing_upstream)?;
        let upstream = self.rewriter.upstream();
        let (host, port) = upstream.host_and_port();
        let peer_host = format!("{}.{}", bucket, host);

        let mut peer = Box::new(HttpPeer::new(
            (peer_host.clone(), port),
            upstream.use_tls(),
            peer_host.clone(),
        ));

        let timeout = Duration::from_secs(upstream.timeout);
        peer.options.connection_timeout = Some(timeout);
        peer.options.read_timeout = Some(timeout);
        peer.options.write_timeout = Some(timeout);

        tracing::debug!(
            request_id = %ctx.request_id(),
            peer = %peer_host,
            port = port,
            tls = upstream.use_tls(),
            timeout_seconds = upstream.timeout,
            "Configured OSS peer"
        );

        Ok(peer)
    }

    /// Replace URI and headers with the rewritten request
    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        let upstream = ctx.upstream().ok_or_else(missing_upstream)?;
        apply_upstream_request(upstream, upstream_request)
    }

    /// Tag upstream responses with the request id
    fn upstream_response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        upstream_response
            .insert_header(REQUEST_ID_HEADER, ctx.request_id())
            .map_err(|e| {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    error = ?e,
                    "Failed to add X-Request-ID header"
                );
                e
            })?;

        Ok(())
    }

    /// Send the empty DeleteResult document for quiet-mode deletes
    async fn response_filter(
        &self,
        session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        if !needs_delete_result_patch(ctx.method(), ctx.raw_query(), &upstream_response.headers)
        {
            return Ok(());
        }

        tracing::debug!(
            request_id = %ctx.request_id(),
            bucket = ctx.bucket().unwrap_or("unknown"),
            "Replacing empty quiet-mode DeleteResult body"
        );
        apply_delete_result_patch(upstream_response)?;
        ctx.set_patch_delete_result(true);

        // The upstream header already ended the body, so no body chunk
        // follows. Pingora skips its own write of an already sent header.
        session
            .write_response_header(Box::new(upstream_response.clone()), false)
            .await?;
        session
            .write_response_body(Some(delete_result_body()), true)
            .await?;

        Ok(())
    }

    fn response_body_filter(
        &self,
        _session: &mut Session,
        body: &mut Option<Bytes>,
        _end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> Result<Option<Duration>> {
        if ctx.patch_delete_result() {
            discard_upstream_body(body);
        }
        Ok(None)
    }

    /// Access log line per request
    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX) {
        let status_code = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(0);
        let client_ip = self.get_client_ip(session);
        let bucket = ctx.bucket().unwrap_or("-");

        if let Some(error) = e {
            tracing::warn!(
                request_id = %ctx.request_id(),
                client_ip = %client_ip,
                method = %ctx.method(),
                path = %ctx.path(),
                bucket = %bucket,
                error = %error,
                duration_ms = ctx.elapsed_ms(),
                "Request failed"
            );
        }

        tracing::info!(
            request_id = %ctx.request_id(),
            client_ip = %client_ip,
            method = %ctx.method(),
            path = %ctx.path(),
            status_code = status_code,
            bucket = %bucket,
            duration_ms = ctx.elapsed_ms(),
            "Request completed"
        );
    }
}
