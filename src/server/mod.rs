// Server module - Pingora server setup and listener wiring

use pingora::server::configuration::Opt as ServerOpt;
use pingora_core::server::Server;

use crate::config::Config;
use crate::proxy::OssProxy;

/// Process-level launch flags handed to Pingora
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Detach and run in the background
    pub daemon: bool,
    /// Validate configuration and exit
    pub test: bool,
    /// Take over listening sockets from a running instance
    pub upgrade: bool,
}

impl LaunchOptions {
    /// Pingora server options for these flags
    pub fn server_opt(&self) -> ServerOpt {
        ServerOpt {
            daemon: self.daemon,
            test: self.test,
            upgrade: self.upgrade,
            ..Default::default()
        }
    }
}

/// Build the Pingora server with the OSS proxy service attached.
///
/// The returned server is bootstrapped; call `run_forever` to serve.
pub fn build_server(
    config: &Config,
    options: LaunchOptions,
) -> Result<Server, Box<pingora_core::Error>> {
    let mut server = Server::new(Some(options.server_opt()))?;
    server.bootstrap();

    let proxy = OssProxy::new(config);
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);

    let listen_addr = config.server.listen_address();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        upstream = %format!("{}://{}", config.upstream.scheme, config.upstream.host),
        sign_mode = ?config.sign_mode,
        "OSS proxy listening"
    );

    server.add_service(proxy_service);
    Ok(server)
}
