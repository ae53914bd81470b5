// Error types module

use thiserror::Error;

/// Errors raised while loading or validating process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("Environment variable '{0}' must be set")]
    MissingVariable(String),

    /// A `${VAR}` reference in the config file points at an unset variable
    #[error("Environment variable '{0}' is referenced but not set")]
    UnresolvedReference(String),

    /// A value was present but not acceptable
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors raised while computing a request signature
#[derive(Debug, Error)]
pub enum SignError {
    /// The MAC implementation refused the secret key
    #[error("HMAC rejected the secret key: {0}")]
    InvalidKey(String),

    /// A computed or copied header value cannot be sent over HTTP
    #[error("Header {name} has a value that is not valid HTTP")]
    InvalidHeaderValue { name: String },
}

/// Errors raised while building the outbound request
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Request signing failed: {0}")]
    Sign(#[from] SignError),

    #[error("Invalid upstream URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
}
