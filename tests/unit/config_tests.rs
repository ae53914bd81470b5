// Configuration loading tests (YAML file source and validation)

use std::io::Write;

use oss_proxy::config::{Config, SignMode};
use oss_proxy::error::ConfigError;
use tempfile::NamedTempFile;

const MINIMAL_YAML: &str = r#"
credentials:
  access_key_id: "AKID"
  secret_access_key: "secret"
"#;

#[test]
fn test_minimal_yaml_uses_defaults() {
    let config = Config::from_yaml_with(MINIMAL_YAML, |_| None).unwrap();

    assert_eq!(config.server.address, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.upstream.scheme, "https");
    assert_eq!(config.upstream.host, "oss-cn-shanghai.aliyuncs.com");
    assert_eq!(config.upstream.timeout, 20);
    assert_eq!(config.sign_mode, SignMode::Proxy);
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
upstream:
  scheme: "http"
  host: "localhost:9000"
  timeout: 5
credentials:
  access_key_id: "AKID"
  secret_access_key: "secret"
sign_mode: redirect
"#;
    let config = Config::from_yaml_with(yaml, |_| None).unwrap();

    assert_eq!(config.server.listen_address(), "127.0.0.1:8080");
    assert_eq!(config.upstream.host_and_port(), ("localhost", 9000));
    assert_eq!(config.upstream.timeout, 5);
    assert_eq!(config.sign_mode, SignMode::Redirect);
}

#[test]
fn test_yaml_without_credentials_fails_to_parse() {
    let yaml = r#"
server:
  port: 8080
"#;
    let err = Config::from_yaml_with(yaml, |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_from_file_reads_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(MINIMAL_YAML.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.credentials.access_key_id, "AKID");
}

#[test]
fn test_from_file_missing_path_is_io_error() {
    let err = Config::from_file("/nonexistent/oss-proxy/config.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_validation_rejects_zero_port_and_timeout() {
    let mut config = Config::from_yaml_with(MINIMAL_YAML, |_| None).unwrap();
    config.server.port = 0;
    assert!(config.validate().is_err());

    let mut config = Config::from_yaml_with(MINIMAL_YAML, |_| None).unwrap();
    config.upstream.timeout = 0;
    assert!(config.validate().is_err());

    let mut config = Config::from_yaml_with(MINIMAL_YAML, |_| None).unwrap();
    config.upstream.host.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_empty_credentials() {
    let mut config = Config::from_yaml_with(MINIMAL_YAML, |_| None).unwrap();
    config.credentials.secret_access_key.clear();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("SECRET_ACCESS_KEY"));
}
