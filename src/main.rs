use anyhow::{anyhow, Context};
use clap::Parser;
use oss_proxy::config::Config;
use oss_proxy::server::{build_server, LaunchOptions};
use std::path::PathBuf;

/// OSS Proxy - signs requests for Aliyun OSS, built on Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "oss-proxy")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file (environment variables are used if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() -> anyhow::Result<()> {
    oss_proxy::logging::init_subscriber()
        .map_err(|e| anyhow!("failed to initialize logging subsystem: {}", e))?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::from_env().context("failed to load configuration from environment")?,
    };
    config.validate().context("invalid configuration")?;

    tracing::info!(
        config_source = %args
            .config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string()),
        server_address = %config.server.address,
        server_port = config.server.port,
        upstream_host = %config.upstream.host,
        "Configuration loaded successfully"
    );

    let options = LaunchOptions {
        daemon: args.daemon,
        test: args.test,
        upgrade: args.upgrade,
    };
    let server = build_server(&config, options)
        .map_err(|e| anyhow!("failed to create Pingora server: {}", e))?;

    // Blocks until shutdown
    server.run_forever();
}
