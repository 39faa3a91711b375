//! Identity extraction from reverse-proxy headers.
//!
//! The gateway runs behind an authenticating proxy that forwards the
//! logged-in account as `x-auth-request-*` headers. A missing username
//! header means the caller is anonymous; handlers that allow both
//! identities branch on the extracted [`Principal`].

use axum::http::HeaderMap;

use crate::domain::Principal;

/// Header carrying the authenticated username.
pub const USER_HEADER: &str = "x-auth-request-user";
/// Header carrying the authenticated email address.
pub const EMAIL_HEADER: &str = "x-auth-request-email";
/// Header carrying the authenticated display name.
pub const DISPLAY_NAME_HEADER: &str = "x-auth-request-display-name";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Extracts the authenticated principal from proxy headers, if any.
#[must_use]
pub fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let username = header_value(headers, USER_HEADER)?;
    Some(Principal {
        username: username.to_string(),
        email: header_value(headers, EMAIL_HEADER).map(str::to_string),
        display_name: header_value(headers, DISPLAY_NAME_HEADER).map(str::to_string),
    })
}

/// Best-effort client address for participation records.
///
/// Takes the first `x-forwarded-for` hop, falls back to `x-real-ip`,
/// and returns an empty string when neither header is present.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for")
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    header_value(headers, "x-real-ip")
        .map(str::to_string)
        .unwrap_or_default()
}
