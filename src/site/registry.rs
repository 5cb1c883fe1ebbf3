// Site registry — at most one Site per origin.
//
// Every lookup goes through the normalized URL, so the cached profile and
// the timestamp counter for a site are shared by everyone holding the
// registry. Sites are never evicted; the registry lives as long as its owner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::models::Follow;
use super::url::normalize_url;
use super::Site;
use crate::store::{Archive, ArchiveOpener, SourceHandle};

/// How a site is first introduced to the registry.
pub enum SiteSource {
    /// Open the site's archive through the registry's opener.
    Url(String),
    /// Adopt an archive the caller already has open.
    Archive(Arc<dyn Archive>),
}

pub struct SiteRegistry {
    sites: DashMap<String, Arc<Site>>,
    opener: Arc<dyn ArchiveOpener>,
    default_timeout: Option<Duration>,
}

impl SiteRegistry {
    pub fn new(opener: Arc<dyn ArchiveOpener>, default_timeout: Option<Duration>) -> Self {
        Self {
            sites: DashMap::new(),
            opener,
            default_timeout,
        }
    }

    /// Return the registered site for this source, creating it if needed.
    pub fn open(&self, source: SiteSource) -> Result<Arc<Site>> {
        let url = match &source {
            SiteSource::Url(url) => url.as_str(),
            SiteSource::Archive(archive) => archive.url(),
        };
        let key = normalize_url(url)?;

        match self.sites.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let archive = match source {
                    SiteSource::Url(_) => self.opener.open(entry.key())?,
                    SiteSource::Archive(archive) => archive,
                };
                debug!(site = %entry.key(), "Registered site");
                let handle = SourceHandle::new(archive, self.default_timeout);
                let site = Arc::new(Site::new(entry.key().clone(), handle));
                entry.insert(site.clone());
                Ok(site)
            }
        }
    }

    pub fn site(&self, url: &str) -> Result<Arc<Site>> {
        self.open(SiteSource::Url(url.to_string()))
    }

    /// One site per follow entry, in input order. Entries whose URL can't be
    /// opened are logged and skipped.
    pub fn resolve(&self, follows: &[Follow]) -> Vec<Arc<Site>> {
        follows
            .iter()
            .filter_map(|follow| match self.site(&follow.url) {
                Ok(site) => Some(site),
                Err(e) => {
                    warn!(url = %follow.url, error = %e, "Skipping unresolvable site");
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
