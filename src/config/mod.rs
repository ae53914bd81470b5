// Configuration module
//
// The proxy is normally configured from the environment (ACCESS_KEY_ID,
// SECRET_ACCESS_KEY, PORT, UPSTREAM_ENDPOINT, SIGN_MODE). A YAML file with
// ${VAR} references can be used instead.

mod server;
mod upstream;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::oss::SignerConfig;

pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

/// How resource requests are served
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignMode {
    /// Sign and forward the request, relaying the upstream response
    #[default]
    Proxy,
    /// Answer with a 307 to a presigned upstream URL
    Redirect,
}

impl FromStr for SignMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROXY" => Ok(SignMode::Proxy),
            "REDIRECT" => Ok(SignMode::Redirect),
            other => Err(ConfigError::InvalidValue {
                field: "SIGN_MODE".to_string(),
                reason: format!("expected PROXY or REDIRECT, got '{}'", other),
            }),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    pub credentials: Credentials,
    #[serde(default)]
    pub sign_mode: SignMode,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Credentials are mandatory. An unparseable `PORT` or
    /// `UPSTREAM_ENDPOINT` falls back to the default with a warning.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
        };
        let credentials = Credentials {
            access_key_id: required("ACCESS_KEY_ID")?,
            secret_access_key: required("SECRET_ACCESS_KEY")?,
        };

        let mut server = ServerConfig::default();
        if let Some(address) = lookup("LISTEN_ADDRESS").filter(|v| !v.is_empty()) {
            server.address = address;
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            match port.parse::<u16>() {
                Ok(port) => server.port = port,
                Err(_) => tracing::warn!(
                    value = %port,
                    default = server.port,
                    "Invalid PORT, using default"
                ),
            }
        }

        let mut upstream = UpstreamConfig::default();
        if let Some(endpoint) = lookup("UPSTREAM_ENDPOINT").filter(|v| !v.is_empty()) {
            match UpstreamConfig::from_endpoint(&endpoint) {
                Some(parsed) => upstream = parsed,
                None => tracing::warn!(
                    value = %endpoint,
                    "Invalid UPSTREAM_ENDPOINT, using default upstream"
                ),
            }
        }
        if let Some(timeout) = lookup("UPSTREAM_TIMEOUT").filter(|v| !v.is_empty()) {
            upstream.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "UPSTREAM_TIMEOUT".to_string(),
                reason: format!("'{}' is not a number of seconds", timeout),
            })?;
        }

        let sign_mode = match lookup("SIGN_MODE").filter(|v| !v.is_empty()) {
            Some(mode) => mode.parse()?,
            None => SignMode::default(),
        };

        Ok(Config {
            server,
            upstream,
            credentials,
            sign_mode,
        })
    }

    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_with(yaml, |name| std::env::var(name).ok())
    }

    /// Parse YAML after replacing `${VAR_NAME}` with looked-up values
    pub fn from_yaml_with<F>(yaml: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| {
            ConfigError::InvalidValue {
                field: "pattern".to_string(),
                reason: e.to_string(),
            }
        })?;

        // Check every reference first so the error names the missing variable
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if lookup(var_name).is_none() {
                return Err(ConfigError::UnresolvedReference(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_default()
        });

        Ok(serde_yaml::from_str(&substituted)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.access_key_id.is_empty() {
            return Err(ConfigError::MissingVariable("ACCESS_KEY_ID".to_string()));
        }
        if self.credentials.secret_access_key.is_empty() {
            return Err(ConfigError::MissingVariable("SECRET_ACCESS_KEY".to_string()));
        }

        let scheme = self.upstream.scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidValue {
                field: "upstream.scheme".to_string(),
                reason: format!("unsupported scheme '{}'", self.upstream.scheme),
            });
        }
        if self.upstream.host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "upstream.host".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }
        if self.upstream.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upstream.timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Credentials and upstream identity handed to the signer
    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            access_key_id: self.credentials.access_key_id.clone(),
            secret_access_key: self.credentials.secret_access_key.clone(),
            upstream_scheme: self.upstream.scheme.clone(),
            upstream_host: self.upstream.host.clone(),
        }
    }
}
