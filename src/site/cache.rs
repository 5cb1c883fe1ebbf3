// Per-site parsed-file cache.
//
// Memoizes one JSON document (the profile) per site. A missing file is a
// valid empty state: NotFound maps to T::default() and is cached like any
// other successful read. Every other failure goes back to the caller and
// leaves the cache untouched.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::store::SourceHandle;

/// Options for a cached read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub timeout: Option<Duration>,
    /// Skip the cached value and read from the store. The fresh value
    /// replaces whatever was cached.
    pub bypass_cache: bool,
}

impl ReadOptions {
    pub fn fresh(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            bypass_cache: true,
        }
    }
}

/// The cached value plus a count of writes made through `put`. A store read
/// only lands in the cache if no `put` finished while it was in flight.
struct Slot<T> {
    value: Option<T>,
    generation: u64,
}

pub struct CachedFile<T> {
    path: String,
    slot: RwLock<Slot<T>>,
}

impl<T> CachedFile<T>
where
    T: Clone + Default + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            slot: RwLock::new(Slot {
                value: None,
                generation: 0,
            }),
        }
    }

    pub async fn get(&self, handle: &SourceHandle, opts: ReadOptions) -> Result<T, StoreError> {
        let started_at = {
            let slot = self.slot.read().await;
            if !opts.bypass_cache {
                if let Some(cached) = slot.value.as_ref() {
                    return Ok(cached.clone());
                }
            }
            slot.generation
        };

        let value = match handle.read_file(&self.path, opts.timeout).await {
            Ok(bytes) => serde_json::from_slice::<T>(&bytes).map_err(|e| StoreError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })?,
            Err(StoreError::NotFound(_)) => {
                debug!(
                    url = handle.archive().url(),
                    path = %self.path,
                    "File not found, using empty default (this may not be a bug)"
                );
                T::default()
            }
            Err(e) => return Err(e),
        };

        let mut slot = self.slot.write().await;
        if slot.generation == started_at {
            slot.value = Some(value.clone());
        } else {
            debug!(
                url = handle.archive().url(),
                path = %self.path,
                "Read overtaken by a local write, keeping the cached value"
            );
        }
        Ok(value)
    }

    /// Write `value`, commit it, then make it the cached value.
    pub async fn put(&self, handle: &SourceHandle, value: T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&value).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        handle.write_file(&self.path, &bytes).await?;
        handle.commit().await?;
        let mut slot = self.slot.write().await;
        slot.value = Some(value);
        slot.generation += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::site::models::{Profile, PROFILE_PATH};
    use crate::store::memory::MemoryArchive;

    fn setup() -> (Arc<MemoryArchive>, SourceHandle) {
        let archive = Arc::new(MemoryArchive::new("dat://alice"));
        let handle = SourceHandle::new(archive.clone(), None);
        (archive, handle)
    }

    #[tokio::test]
    async fn missing_file_yields_default_and_is_cached() {
        let (archive, handle) = setup();
        let cache: CachedFile<Profile> = CachedFile::new(PROFILE_PATH);

        assert_eq!(cache.get(&handle, ReadOptions::default()).await.unwrap(), Profile::default());

        // Cached: the archive going offline doesn't matter.
        archive.set_offline(true);
        assert!(cache.get(&handle, ReadOptions::default()).await.is_ok());
        assert!(cache.get(&handle, ReadOptions::fresh(None)).await.is_err());
    }

    #[tokio::test]
    async fn bypass_sees_external_changes() {
        let (archive, handle) = setup();
        let cache: CachedFile<Profile> = CachedFile::new(PROFILE_PATH);
        archive.insert_file(PROFILE_PATH, r#"{"name":"Old"}"#);
        cache.get(&handle, ReadOptions::default()).await.unwrap();

        archive.insert_file(PROFILE_PATH, r#"{"name":"New"}"#);
        let stale = cache.get(&handle, ReadOptions::default()).await.unwrap();
        assert_eq!(stale.name.as_deref(), Some("Old"));
        let fresh = cache.get(&handle, ReadOptions::fresh(None)).await.unwrap();
        assert_eq!(fresh.name.as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn parse_failure_is_not_cached() {
        let (archive, handle) = setup();
        let cache: CachedFile<Profile> = CachedFile::new(PROFILE_PATH);
        archive.insert_file(PROFILE_PATH, "not json");

        let err = cache.get(&handle, ReadOptions::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));

        archive.insert_file(PROFILE_PATH, r#"{"name":"Fixed"}"#);
        let profile = cache.get(&handle, ReadOptions::default()).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Fixed"));
    }

    #[tokio::test]
    async fn put_writes_commits_and_replaces_cache() {
        let (archive, handle) = setup();
        let cache: CachedFile<Profile> = CachedFile::new(PROFILE_PATH);
        let profile = Profile {
            name: Some("Alice".into()),
            ..Default::default()
        };
        cache.put(&handle, profile.clone()).await.unwrap();
        assert_eq!(archive.version(), 1);

        archive.set_offline(true);
        assert_eq!(cache.get(&handle, ReadOptions::default()).await.unwrap(), profile);
    }
}
