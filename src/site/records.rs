// Timestamp-named JSON records — broadcasts and votes.
//
// A record lives at `<dir>/<createdAt>.json`. The name is the record's
// identity within the site, so it comes from the site's TimestampCounter
// and can't collide with another record written by this process.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex_lite::Regex;
use serde::Serialize;
use tracing::debug;

use super::Site;
use crate::store::SourceHandle;

static RECORD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\.json$").expect("record pattern is valid"));

/// The timestamp encoded in a record name or path: the digits right before
/// a trailing `.json`, so `post-1500.json` is 1500.
pub fn parse_record_name(name: &str) -> Option<i64> {
    RECORD_NAME_RE
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn record_path(dir: &str, ts: i64) -> String {
    format!("{}/{ts}.json", dir.trim_end_matches('/'))
}

/// Create every ancestor directory of `path`. Failures (usually "already
/// exists") are logged and ignored; the write that follows reports anything
/// that actually matters.
pub async fn ensure_parent_dirs(handle: &SourceHandle, path: &str) {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let mut dir = String::new();
    for part in parts.iter().take(parts.len().saturating_sub(1)) {
        dir.push('/');
        dir.push_str(part);
        if let Err(e) = handle.mkdir(&dir).await {
            debug!(dir = %dir, error = %e, "mkdir skipped");
        }
    }
}

/// Append a new record under `dir`, commit it, and return its URL and
/// timestamp. `build` receives the timestamp so it can be stored inside the
/// document as well.
pub async fn append_record<T, F>(site: &Site, dir: &str, build: F) -> Result<(String, i64)>
where
    T: Serialize,
    F: FnOnce(i64) -> T,
{
    let ts = site.clock().next();
    let path = record_path(dir, ts);
    let bytes = serde_json::to_vec_pretty(&build(ts)).context("Failed to serialize record")?;

    let handle = site.handle();
    ensure_parent_dirs(handle, &path).await;
    handle
        .write_file(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}{}", site.url(), path))?;
    handle
        .commit()
        .await
        .with_context(|| format!("Failed to commit {}", site.url()))?;

    Ok((format!("{}{}", site.url(), path), ts))
}
