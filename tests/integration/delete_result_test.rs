// End-to-end tests for the quiet-mode DeleteResult body through a running proxy

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};
use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::sync::mpsc;

use oss_proxy::config::{Config, Credentials, ServerConfig, SignMode, UpstreamConfig};
use oss_proxy::constants::EMPTY_DELETE_RESULT;
use oss_proxy::oss::OssSigner;
use oss_proxy::pipeline::RequestContext;
use oss_proxy::proxy::OssProxy;

const DELETE_REQUEST: &str = "<Delete><Quiet>true</Quiet>\
<Object><Key>a.txt</Key></Object></Delete>";

/// Helper function to find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
}

/// OssProxy with the `{bucket}.{host}` peer replaced by the mock upstream,
/// since bucket subdomains of 127.0.0.1 do not resolve.
struct LocalUpstreamProxy {
    inner: OssProxy,
    upstream_port: u16,
}

#[async_trait]
impl ProxyHttp for LocalUpstreamProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        self.inner.new_ctx()
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        self.inner.request_filter(session, ctx).await
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Ok(Box::new(HttpPeer::new(
            ("127.0.0.1".to_string(), self.upstream_port),
            false,
            String::new(),
        )))
    }

    async fn upstream_request_filter(
        &self,
        session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        self.inner
            .upstream_request_filter(session, upstream_request, ctx)
            .await
    }

    fn upstream_response_filter(
        &self,
        session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        self.inner
            .upstream_response_filter(session, upstream_response, ctx)
    }

    async fn response_filter(
        &self,
        session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        self.inner
            .response_filter(session, upstream_response, ctx)
            .await
    }

    fn response_body_filter(
        &self,
        session: &mut Session,
        body: &mut Option<Bytes>,
        end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> Result<Option<Duration>> {
        self.inner
            .response_body_filter(session, body, end_of_stream, ctx)
    }
}

fn header_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|position| position + 4)
}

/// Read one request, headers and Content-Length body
async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buffer = vec![0u8; 4096];
    loop {
        let n = socket.read(&mut buffer).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        if let Some(end) = header_end(&data) {
            let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

/// Mock OSS upstream answering every request with `response`.
/// Each received request is forwarded on the returned channel.
async fn create_oss_server(port: u16, response: &'static str) -> mpsc::UnboundedReceiver<String> {
    let listener = TokioTcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .unwrap();
    let (sender, receiver) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            if let Ok((mut socket, _)) = listener.accept().await {
                let sender = sender.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    let _ = sender.send(request);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        }
    });

    receiver
}

fn start_proxy(proxy_port: u16, upstream_port: u16) {
    let config = Config {
        server: ServerConfig {
            address: "127.0.0.1".to_string(),
            port: proxy_port,
        },
        upstream: UpstreamConfig::from_endpoint(&format!("http://127.0.0.1:{}", upstream_port))
            .unwrap(),
        credentials: Credentials {
            access_key_id: "AKID".to_string(),
            secret_access_key: "secret".to_string(),
        },
        sign_mode: SignMode::Proxy,
    };
    let signer = Arc::new(OssSigner::new(config.signer_config()).with_clock(fixed_clock));
    let proxy = LocalUpstreamProxy {
        inner: OssProxy::with_signer(&config, signer),
        upstream_port,
    };

    std::thread::spawn(move || {
        let mut server =
            pingora_core::server::Server::new(None).expect("Failed to create Pingora server");
        server.bootstrap();

        let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
        proxy_service.add_tcp(&config.server.listen_address());
        server.add_service(proxy_service);

        server.run_forever();
    });
}

async fn wait_for_port(port: u16) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("proxy did not start on port {}", port);
}

#[tokio::test]
async fn test_empty_quiet_delete_returns_delete_result_document() {
    let upstream_port = get_available_port();
    let mut requests =
        create_oss_server(upstream_port, "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;

    let proxy_port = get_available_port();
    start_proxy(proxy_port, upstream_port);
    wait_for_port(proxy_port).await;

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let response = client
        .post(format!("http://127.0.0.1:{}/bucket/?delete", proxy_port))
        .header("Content-Type", "application/xml")
        .body(DELETE_REQUEST)
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/xml"
    );
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.text().await.unwrap(), EMPTY_DELETE_RESULT);

    let forwarded = requests.recv().await.unwrap().to_ascii_lowercase();
    assert!(forwarded.starts_with("post /?delete http/1.1\r\n"));
    assert!(forwarded.contains("authorization: oss akid:"));
    assert!(forwarded.contains(&format!("host: bucket.127.0.0.1:{}", upstream_port)));
    assert!(forwarded.ends_with(&DELETE_REQUEST.to_ascii_lowercase()));
}

#[tokio::test]
async fn test_non_empty_delete_result_passes_through() {
    const UPSTREAM_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: application/xml\r\n\
Content-Length: 53\r\n\r\n\
<DeleteResult><Deleted>a.txt</Deleted></DeleteResult>";

    let upstream_port = get_available_port();
    let _requests = create_oss_server(upstream_port, UPSTREAM_RESPONSE).await;

    let proxy_port = get_available_port();
    start_proxy(proxy_port, upstream_port);
    wait_for_port(proxy_port).await;

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/bucket/?delete", proxy_port))
        .body(DELETE_REQUEST)
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.text().await.unwrap(),
        "<DeleteResult><Deleted>a.txt</Deleted></DeleteResult>"
    );
}
