// Feed aggregation — merge broadcasts from many sites into one page.
//
// Every site is listed concurrently and each listing is bounded by the
// query timeout. A site that fails to answer contributes nothing; it never
// fails the whole feed. Entries are sorted only after every listing is in,
// so the order doesn't depend on which site answered first. Pagination
// happens before any broadcast content is fetched.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use super::models::{Broadcast, FeedEntry, FeedQuery, BROADCASTS_DIR};
use crate::error::StoreError;
use crate::site::cache::ReadOptions;
use crate::site::models::Profile;
use crate::site::records::parse_record_name;
use crate::site::{Site, SiteRegistry};

/// Merge the broadcasts of `sites` into one sorted, paginated feed.
pub async fn list_feed(sites: &[Arc<Site>], query: &FeedQuery) -> Vec<FeedEntry> {
    let listings = join_all(sites.iter().map(|site| list_site(site, query))).await;
    let mut feed: Vec<FeedEntry> = listings.into_iter().flatten().collect();

    // Stable sorts: equal timestamps keep site order, then name order.
    if query.reverse {
        feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    } else {
        feed.sort_by_key(|entry| entry.timestamp);
    }

    let mut feed: Vec<FeedEntry> = feed
        .into_iter()
        .skip(query.offset)
        .take(query.effective_limit())
        .collect();

    if query.meta_only {
        return feed;
    }

    join_all(
        feed.iter_mut()
            .map(|entry| load_content(entry, query.timeout)),
    )
    .await;

    if let Some(kind) = &query.kind {
        feed.retain(|entry| {
            entry
                .content
                .as_ref()
                .and_then(|c| c.kind.as_deref())
                .is_some_and(|k| k.eq_ignore_ascii_case(kind))
        });
    }

    debug!(
        sites = sites.len(),
        entries = feed.len(),
        "Feed assembled"
    );

    feed
}

/// A single site's own broadcasts.
pub async fn list_broadcasts(site: &Arc<Site>, query: &FeedQuery) -> Vec<FeedEntry> {
    list_feed(std::slice::from_ref(site), query).await
}

/// The site's home feed: its own broadcasts plus those of every site it follows.
///
/// If the site's own profile can't be read the feed falls back to the
/// site's own broadcasts.
pub async fn home_feed(
    registry: &SiteRegistry,
    site: &Arc<Site>,
    query: &FeedQuery,
) -> Vec<FeedEntry> {
    let follows = match site
        .get_profile(ReadOptions {
            timeout: query.timeout,
            bypass_cache: false,
        })
        .await
    {
        Ok(profile) => profile.follows,
        Err(e) => {
            warn!(site = %site.url(), error = %e, "Could not read follows, showing own broadcasts only");
            Vec::new()
        }
    };

    let mut sites = vec![site.clone()];
    for followed in registry.resolve(&follows) {
        if !sites.iter().any(|s| Arc::ptr_eq(s, &followed)) {
            sites.push(followed);
        }
    }

    list_feed(&sites, query).await
}

/// Read one broadcast by file name (`1500.json`) or path (`/broadcasts/1500.json`).
pub async fn get_broadcast(
    site: &Arc<Site>,
    path: &str,
    timeout: Option<Duration>,
) -> Result<FeedEntry> {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    let timestamp = parse_record_name(&name)
        .ok_or_else(|| StoreError::Validation(format!("not a broadcast name: {path:?}")))?;
    let full_path = format!("{BROADCASTS_DIR}/{name}");

    let handle = site.handle();
    handle
        .stat(&full_path, timeout)
        .await
        .with_context(|| format!("Failed to stat {}{}", site.url(), full_path))?;
    let bytes = handle
        .read_file(&full_path, timeout)
        .await
        .with_context(|| format!("Failed to read {}{}", site.url(), full_path))?;
    let content = parse_broadcast(&full_path, &bytes)?;

    Ok(FeedEntry {
        url: format!("{}{}", site.url(), full_path),
        name,
        timestamp,
        site: site.clone(),
        site_profile: profile_or_default(site, timeout).await,
        content: Some(content),
        error: None,
    })
}

async fn list_site(site: &Arc<Site>, query: &FeedQuery) -> Vec<FeedEntry> {
    let names = match site.handle().readdir(BROADCASTS_DIR, query.timeout).await {
        Ok(names) => names,
        Err(StoreError::NotFound(_)) => {
            debug!(site = %site.url(), "Site has no broadcasts");
            return Vec::new();
        }
        Err(e) => {
            warn!(site = %site.url(), error = %e, "Failed to list broadcasts, skipping site");
            return Vec::new();
        }
    };

    let site_profile = profile_or_default(site, query.timeout).await;

    names
        .into_iter()
        .filter_map(|name| {
            let timestamp = parse_record_name(&name)?;
            if !query.in_range(timestamp) {
                return None;
            }
            Some(FeedEntry {
                url: format!("{}{}/{}", site.url(), BROADCASTS_DIR, name),
                name,
                timestamp,
                site: site.clone(),
                site_profile: site_profile.clone(),
                content: None,
                error: None,
            })
        })
        .collect()
}

async fn load_content(entry: &mut FeedEntry, timeout: Option<Duration>) {
    let path = entry.path();
    let result = match entry.site.handle().read_file(&path, timeout).await {
        Ok(bytes) => parse_broadcast(&path, &bytes),
        Err(e) => Err(e),
    };
    match result {
        Ok(content) => entry.content = Some(content),
        Err(e) => {
            warn!(url = %entry.url, error = %e, "Failed to read broadcast");
            entry.content = None;
            entry.error = Some(e.to_string());
        }
    }
}

fn parse_broadcast(path: &str, bytes: &[u8]) -> Result<Broadcast, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

async fn profile_or_default(site: &Site, timeout: Option<Duration>) -> Profile {
    match site
        .get_profile(ReadOptions {
            timeout,
            bypass_cache: false,
        })
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            debug!(site = %site.url(), error = %e, "Profile unavailable for feed entries");
            Profile::default()
        }
    }
}
