// Site URL normalization.
//
// A site is identified by `scheme://host`. Paths, queries and fragments are
// stripped before any comparison or registry lookup, so two references to
// different files on the same site name the same site.

use std::sync::LazyLock;

use anyhow::Result;
use regex_lite::Regex;

use crate::error::StoreError;

static ORIGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9+.\-]*)://([^/\\?#\s]+)").expect("origin pattern is valid")
});

/// Scheme and host of a site URL. `.` and `..` are not hosts: local sites are
/// stored in a directory named after the host.
fn origin_parts(url: &str) -> Result<(String, &str)> {
    let caps = ORIGIN_RE
        .captures(url)
        .ok_or_else(|| StoreError::Validation(format!("not a site URL: {url:?}")))?;
    let host = caps.get(2).map_or("", |m| m.as_str());
    if host == "." || host == ".." {
        return Err(StoreError::Validation(format!("not a site host: {host:?}")).into());
    }
    Ok((caps[1].to_ascii_lowercase(), host))
}

/// Reduce a URL to its site origin, `scheme://host`.
pub fn normalize_url(url: &str) -> Result<String> {
    let (scheme, host) = origin_parts(url)?;
    Ok(format!("{scheme}://{host}"))
}

/// The host part of a site URL.
pub fn site_host(url: &str) -> Result<String> {
    Ok(origin_parts(url)?.1.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_query_and_fragment() {
        assert_eq!(
            normalize_url("dat://abc123/broadcasts/1.json?x=1#top").unwrap(),
            "dat://abc123"
        );
        assert_eq!(normalize_url("dat://abc123").unwrap(), "dat://abc123");
        assert_eq!(normalize_url("DAT://abc123/").unwrap(), "dat://abc123");
    }

    #[test]
    fn rejects_non_urls() {
        assert!(normalize_url("abc123").is_err());
        assert!(normalize_url("").is_err());
        assert!(normalize_url("dat:///path-only").is_err());
    }

    #[test]
    fn dot_hosts_are_rejected() {
        assert!(normalize_url("dat://..").is_err());
        assert!(normalize_url("dat://./profile.json").is_err());
        assert!(site_host("dat://../x").is_err());
        assert!(normalize_url("dat://..\\etc").is_err());
        assert_eq!(normalize_url("dat://...").unwrap(), "dat://...");
    }

    #[test]
    fn host_is_extracted() {
        assert_eq!(site_host("https://example.com:8080/a").unwrap(), "example.com:8080");
    }
}
