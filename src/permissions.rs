//! Permission gate for requests originating from UI surfaces.
//!
//! The main surface is trusted outright for the small allow-list of
//! permission kinds the client uses. Any other origin is granted only when
//! its URL matches a configured server by origin. Everything else is denied.

use std::sync::Arc;

use crate::utils::url::origins_match;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionKind {
    Media,
    Geolocation,
    Notifications,
    Fullscreen,
    OpenExternal,
    Other(String),
}

impl PermissionKind {
    fn allowed_kind(&self) -> bool {
        !matches!(self, PermissionKind::Other(_))
    }
}

#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub kind: PermissionKind,
    /// URL of the frame making the request.
    pub requesting_url: String,
    /// Whether the request came from the main UI surface.
    pub from_main_surface: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Grant,
    Deny,
}

/// Callback shape installed into the view binding at startup.
pub type PermissionHandler =
    Arc<dyn Fn(&PermissionRequest) -> PermissionDecision + Send + Sync>;

pub fn decide(request: &PermissionRequest, trusted_urls: &[String]) -> PermissionDecision {
    if !request.kind.allowed_kind() {
        return PermissionDecision::Deny;
    }
    if request.from_main_surface {
        return PermissionDecision::Grant;
    }
    let trusted = trusted_urls
        .iter()
        .any(|url| origins_match(url, &request.requesting_url));
    if trusted {
        PermissionDecision::Grant
    } else {
        PermissionDecision::Deny
    }
}

/// Build a handler closed over the configured server URLs.
pub fn handler_for(trusted_urls: Vec<String>) -> PermissionHandler {
    Arc::new(move |request: &PermissionRequest| decide(request, &trusted_urls))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: PermissionKind, url: &str, from_main: bool) -> PermissionRequest {
        PermissionRequest {
            kind,
            requesting_url: url.to_string(),
            from_main_surface: from_main,
        }
    }

    fn trusted() -> Vec<String> {
        vec!["https://acme.example".to_string()]
    }

    #[test]
    fn main_surface_gets_allow_listed_kinds() {
        for kind in [
            PermissionKind::Media,
            PermissionKind::Geolocation,
            PermissionKind::Notifications,
            PermissionKind::Fullscreen,
            PermissionKind::OpenExternal,
        ] {
            assert_eq!(
                decide(&request(kind, "https://anything.example", true), &trusted()),
                PermissionDecision::Grant
            );
        }
    }

    #[test]
    fn other_origins_need_a_configured_server_match() {
        assert_eq!(
            decide(
                &request(PermissionKind::Notifications, "https://acme.example/team", false),
                &trusted()
            ),
            PermissionDecision::Grant
        );
        assert_eq!(
            decide(
                &request(PermissionKind::Notifications, "https://evil.example", false),
                &trusted()
            ),
            PermissionDecision::Deny
        );
    }

    #[test]
    fn unknown_kinds_are_always_denied() {
        assert_eq!(
            decide(
                &request(
                    PermissionKind::Other("midi".to_string()),
                    "https://acme.example",
                    true
                ),
                &trusted()
            ),
            PermissionDecision::Deny
        );
    }
}
