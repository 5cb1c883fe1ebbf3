// Sites — one participant's store plus the in-memory state we keep for it.
//
// A Site owns its source handle, the cached profile, the timestamp counter
// used to name new records, and a lock that serializes profile rewrites.
// Sites are created and shared by the registry; see registry.rs.

pub mod cache;
pub mod models;
pub mod records;
pub mod registry;
pub mod url;

use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;

use crate::store::SourceHandle;
use cache::{CachedFile, ReadOptions};
use models::{Profile, ProfileUpdate, PROFILE_PATH};

pub use registry::{SiteRegistry, SiteSource};

pub struct Site {
    url: String,
    handle: SourceHandle,
    profile: CachedFile<Profile>,
    clock: TimestampCounter,
    write_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site").field("url", &self.url).finish()
    }
}

impl Site {
    /// `url` must already be normalized; the registry guarantees this.
    pub(crate) fn new(url: String, handle: SourceHandle) -> Self {
        Self {
            url,
            handle,
            profile: CachedFile::new(PROFILE_PATH),
            clock: TimestampCounter::default(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn handle(&self) -> &SourceHandle {
        &self.handle
    }

    pub fn clock(&self) -> &TimestampCounter {
        &self.clock
    }

    /// Read this site's profile. A site without a profile yet has an empty one.
    pub async fn get_profile(&self, opts: ReadOptions) -> Result<Profile> {
        self.profile
            .get(&self.handle, opts)
            .await
            .with_context(|| format!("Failed to read profile of {}", self.url))
    }

    /// Overwrite the given profile fields and write the whole document back.
    pub async fn set_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        self.update_profile(|profile| {
            profile.apply(update);
            true
        })
        .await
    }

    /// Read-modify-write of the profile, serialized per site. `mutate`
    /// returns false when nothing changed, in which case nothing is written.
    pub(crate) async fn update_profile<F>(&self, mutate: F) -> Result<Profile>
    where
        F: FnOnce(&mut Profile) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut profile = self.get_profile(ReadOptions::default()).await?;
        if mutate(&mut profile) {
            self.profile
                .put(&self.handle, profile.clone())
                .await
                .with_context(|| format!("Failed to write profile of {}", self.url))?;
            info!(site = %self.url, follows = profile.follows.len(), "Profile updated");
        }
        Ok(profile)
    }
}

/// Issues strictly increasing millisecond timestamps for one site.
///
/// A new timestamp is `max(now, last + 1)`, so two records written in the
/// same millisecond (or after a clock step backwards) never share a name.
#[derive(Debug, Default)]
pub struct TimestampCounter {
    last: Mutex<i64>,
}

impl TimestampCounter {
    pub fn next(&self) -> i64 {
        self.next_after(chrono::Utc::now().timestamp_millis())
    }

    pub fn next_after(&self, now: i64) -> i64 {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let ts = now.max(*last + 1);
        *last = ts;
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tick_is_bumped() {
        let clock = TimestampCounter::default();
        assert_eq!(clock.next_after(1000), 1000);
        assert_eq!(clock.next_after(1000), 1001);
        assert_eq!(clock.next_after(1000), 1002);
        assert_eq!(clock.next_after(999), 1003);
    }

    #[test]
    fn clock_moving_backwards_still_increases() {
        let clock = TimestampCounter::default();
        clock.next_after(5000);
        assert_eq!(clock.next_after(4000), 5001);
        assert_eq!(clock.next_after(9000), 9000);
    }
}
