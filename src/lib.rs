// OSS Proxy Library
// Signs bucket/object requests for Aliyun OSS and relays them through Pingora

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod oss;
pub mod pipeline; // Per-request state across Pingora phases
pub mod proxy;
pub mod server;
