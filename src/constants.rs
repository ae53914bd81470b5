// Constants module - centralized default values and vendor constants
//
// Defaults for configuration live here alongside the fixed strings the
// upstream object storage dictates (range sentinel, delete result body).

// =============================================================================
// Server defaults
// =============================================================================

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default listening address
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";

// =============================================================================
// Upstream defaults
// =============================================================================

/// Default upstream scheme
pub const DEFAULT_UPSTREAM_SCHEME: &str = "https";

/// Default upstream host (bucket names are prepended to this)
pub const DEFAULT_UPSTREAM_HOST: &str = "oss-cn-shanghai.aliyuncs.com";

/// Default upstream connect/read/write timeout in seconds
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

// =============================================================================
// Signing
// =============================================================================

/// Scheme tag placed in front of the credential in the Authorization header
pub const OSS_AUTH_SCHEME: &str = "OSS";

/// Lifetime of presigned redirect URLs in seconds
pub const DEFAULT_PRESIGN_EXPIRES_SECS: i64 = 300;

// =============================================================================
// Request rewriting
// =============================================================================

/// Range end some clients send to mean "until the end" (i64::MAX - 1).
/// OSS rejects it, so it is stripped to leave an open-ended range.
pub const RANGE_UPPER_BOUND: &str = "9223372036854775806";

/// Inbound headers copied onto the outbound request after signing
pub const PASS_THROUGH_HEADERS: &[&str] = &["Range"];

// =============================================================================
// Response normalization
// =============================================================================

/// Body clients expect from a quiet-mode multi-object delete
pub const EMPTY_DELETE_RESULT: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><DeleteResult></DeleteResult>"#;
