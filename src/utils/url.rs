//! URL utilities for consistent server-address handling
//!
//! Server URLs arrive from config files and modal input with inconsistent
//! trailing slashes. Normalizing them once keeps duplicate detection and
//! origin comparison stable.

use url::Url;

/// Normalize a server URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use muster::utils::url::normalize_server_url;
///
/// assert_eq!(normalize_server_url("https://acme.example"), "https://acme.example");
/// assert_eq!(normalize_server_url("https://acme.example/"), "https://acme.example");
/// assert_eq!(normalize_server_url("https://acme.example///"), "https://acme.example");
/// ```
pub fn normalize_server_url(server_url: &str) -> String {
    server_url.trim_end_matches('/').to_string()
}

/// Compare two URLs by origin (scheme, host, port).
///
/// Unparseable input never matches; a trust check on a malformed URL must
/// fail closed.
pub fn origins_match(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}
