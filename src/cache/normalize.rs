//! Canonical comparison keys for page URLs and titles.
//!
//! Both functions fail open: input that cannot be parsed is returned
//! unchanged so callers can still match it verbatim.

use url::Url;

/// `origin + path`, with trailing slashes stripped from the path (an empty
/// path becomes `/`). Query string and fragment are dropped.
pub fn normalize_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let path = url.path().trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    format!("{}{}", url.origin().ascii_serialization(), path)
}

pub fn normalize_title(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// URL authority as `host[:port]`; the port is omitted when it is the
/// scheme default. Hostless URLs (`file:`, `mailto:`) yield an empty string;
/// `None` only when the URL does not parse.
pub fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str().unwrap_or_default();
    Some(match url.port() {
        Some(port) if !host.is_empty() => format!("{host}:{port}"),
        _ => host.to_string(),
    })
}

/// Key for the origin/title index, only computable when the URL has a host.
pub fn origin_title_key(url: &str, title: &str) -> Option<String> {
    host_of(url)
        .filter(|host| !host.is_empty())
        .map(|host| format!("{host}|{}", normalize_title(title)))
}
