// Follow graph — directional follows and the mutual "friend" relation.
//
// A follow edge lives only in the follower's own profile. Friendship is
// never stored: it is recomputed from both sides' profiles on every query,
// reading the other side fresh because it may have changed at any time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error;
use crate::site::cache::ReadOptions;
use crate::site::models::{Follow, Profile};
use crate::site::url::normalize_url;
use crate::site::{Site, SiteRegistry};

/// How the profile attached to a followed site was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Downloaded,
    TimedOut,
    Failed,
}

/// A followed site with a freshly fetched profile.
#[derive(Debug, Clone)]
pub struct FollowedSite {
    pub site: Arc<Site>,
    /// Empty when the fetch did not succeed.
    pub profile: Profile,
    pub status: FetchStatus,
}

impl FollowedSite {
    pub fn url(&self) -> &str {
        self.site.url()
    }

    pub fn downloaded(&self) -> bool {
        self.status == FetchStatus::Downloaded
    }
}

/// Add `url` to the site's follows. Does nothing if it is already there.
pub async fn follow(site: &Site, url: &str, name: Option<&str>) -> Result<()> {
    let target = normalize_url(url)?;
    site.update_profile(|profile| {
        if profile.follows_site(&target) {
            debug!(site = %site.url(), target = %target, "Already following");
            return false;
        }
        profile.follows.push(Follow {
            url: target.clone(),
            name: name.map(str::to_string),
        });
        true
    })
    .await?;
    Ok(())
}

/// Remove `url` from the site's follows. Does nothing if it isn't there.
pub async fn unfollow(site: &Site, url: &str) -> Result<()> {
    site.update_profile(|profile| match profile.follow_index(url) {
        Some(index) => {
            profile.follows.remove(index);
            true
        }
        None => false,
    })
    .await?;
    Ok(())
}

pub async fn is_following(site: &Site, url: &str) -> Result<bool> {
    let profile = site.get_profile(ReadOptions::default()).await?;
    Ok(profile.follows_site(url))
}

/// True when `site` follows `url` and `url` follows `site` back.
///
/// If `site` doesn't follow the target this answers without touching the
/// network. A target whose profile can't be fetched is not a friend.
pub async fn is_friends_with(
    registry: &SiteRegistry,
    site: &Site,
    url: &str,
    timeout: Option<Duration>,
) -> Result<bool> {
    if !is_following(site, url).await? {
        return Ok(false);
    }

    let target = registry.site(url)?;
    match target.get_profile(ReadOptions::fresh(timeout)).await {
        Ok(profile) => Ok(profile.follows_site(site.url())),
        Err(e) => {
            warn!(target = %target.url(), error = %e, "Could not fetch profile for friend check");
            Ok(false)
        }
    }
}

/// Every followed site with its profile, fetched concurrently and fresh.
/// Sites that fail to answer are still listed, with an empty profile.
pub async fn list_following(
    registry: &SiteRegistry,
    site: &Site,
    timeout: Option<Duration>,
) -> Result<Vec<FollowedSite>> {
    let profile = site.get_profile(ReadOptions::default()).await?;
    let sites = registry.resolve(&profile.follows);
    Ok(fetch_profiles(sites, timeout).await)
}

/// Followed sites that follow `site` back.
pub async fn list_friends(
    registry: &SiteRegistry,
    site: &Site,
    timeout: Option<Duration>,
) -> Result<Vec<FollowedSite>> {
    let following = list_following(registry, site, timeout).await?;
    Ok(following
        .into_iter()
        .filter(|f| f.profile.follows_site(site.url()))
        .collect())
}

/// The only followers a site can know about are the ones it follows back.
pub async fn list_known_followers(
    registry: &SiteRegistry,
    site: &Site,
    timeout: Option<Duration>,
) -> Result<Vec<FollowedSite>> {
    list_friends(registry, site, timeout).await
}

async fn fetch_profiles(sites: Vec<Arc<Site>>, timeout: Option<Duration>) -> Vec<FollowedSite> {
    join_all(sites.into_iter().map(|site| async move {
        match site.get_profile(ReadOptions::fresh(timeout)).await {
            Ok(profile) => FollowedSite {
                site,
                profile,
                status: FetchStatus::Downloaded,
            },
            Err(e) => {
                let status = if error::is_timeout(&e) {
                    FetchStatus::TimedOut
                } else {
                    FetchStatus::Failed
                };
                warn!(site = %site.url(), error = %e, ?status, "Profile fetch failed");
                FollowedSite {
                    site,
                    profile: Profile::default(),
                    status,
                }
            }
        }
    }))
    .await
}
