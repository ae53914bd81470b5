//! Routing pre-check.
//!
//! Decides, from the path alone, whether a request is a liveness check, is
//! too short to name a bucket and an object, or should be resolved and
//! proxied.

/// Outcome of the routing pre-check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` or `/livez`: answered locally with `200 OK`
    Health,
    /// Fewer than two `/` in the path: answered locally with `404`
    NotFound,
    /// `/{bucket}/{object}`: resolved, signed and proxied
    Resource,
}

/// Paths answered with `OK` without touching the upstream
pub const HEALTH_PATHS: &[&str] = &["/", "/livez"];

pub fn classify(path: &str) -> Route {
    if HEALTH_PATHS.contains(&path) {
        Route::Health
    } else if path.matches('/').count() < 2 {
        Route::NotFound
    } else {
        Route::Resource
    }
}
