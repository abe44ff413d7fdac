//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Turn a path or pointer handed out by upstream into a request URL.
///
/// Relative targets are joined onto `base`. Absolute targets on the same host
/// are moved onto the base scheme, since upstream advertises `http://` links
/// for a host that is only reachable over TLS.
pub fn upstream_url(base: &Url, target: &str) -> Result<Url> {
    let mut url = base.join(target.trim())?;
    if url.host_str() == base.host_str() && url.scheme() != base.scheme() {
        // Both http and https are special schemes, so the swap cannot fail.
        let _ = url.set_scheme(base.scheme());
        if url.port() == base.port_or_known_default() {
            let _ = url.set_port(None);
        }
    }
    Ok(url)
}

/// Cache key for a record URL: case-folded and scheme-insensitive.
pub fn url_key(url: &str) -> String {
    let folded = url.trim().to_lowercase();
    folded
        .strip_prefix("https://")
        .or_else(|| folded.strip_prefix("http://"))
        .map(String::from)
        .unwrap_or(folded)
}

/// Cache key for a record name.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://swapi.dev/api/").unwrap();
        assert_eq!(resolve_url(&base, "people/"), "https://swapi.dev/api/people/");
        assert_eq!(
            resolve_url(&base, "/api/films/1/"),
            "https://swapi.dev/api/films/1/"
        );
    }

    #[test]
    fn test_upstream_url_upgrades_same_host_scheme() {
        let base = Url::parse("https://swapi.dev/api/").unwrap();
        let url = upstream_url(&base, "http://swapi.dev/api/people/?page=2").unwrap();
        assert_eq!(url.as_str(), "https://swapi.dev/api/people/?page=2");
    }

    #[test]
    fn test_upstream_url_leaves_foreign_hosts() {
        let base = Url::parse("https://swapi.dev/api/").unwrap();
        let url = upstream_url(&base, "http://mirror.example/api/people/").unwrap();
        assert_eq!(url.as_str(), "http://mirror.example/api/people/");
    }

    #[test]
    fn test_url_key_ignores_scheme_and_case() {
        assert_eq!(
            url_key("HTTPS://swapi.dev/api/People/1/"),
            url_key("http://swapi.dev/api/people/1/")
        );
        assert_eq!(url_key("/x/1"), "/x/1");
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("  Luke Skywalker "), "luke skywalker");
    }
}
